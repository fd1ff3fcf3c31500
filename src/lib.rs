//! readaloud - console text-to-speech reader
//!
//! Paste text or open a PDF/text document, synthesize it with a remote
//! speech service and play it back with transport controls and a live
//! spectrum, all inside the terminal.

pub mod audio;
pub mod clipboard;
pub mod document;
pub mod error;
pub mod input;
pub mod speech;
pub mod state;
pub mod terminal;

pub use error::{DecodeError, ReadAloudError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "readaloud";
