//! Speech synthesis
//!
//! Voices, text preparation and the remote synthesis client.

pub mod client;
pub mod text;
pub mod voice;

pub use client::{GeminiClient, SpeechClient};
pub use text::{PreparedText, MAX_TEXT_LENGTH};
pub use voice::Voice;

use crate::{ReadAloudError, Result};
use log::info;

/// Outcome of a synthesis request
#[derive(Debug, Clone)]
pub struct Synthesized {
    /// Base64 PCM payload
    pub audio: String,
    /// Whether the text was cut to [`MAX_TEXT_LENGTH`] first
    pub truncated: bool,
}

/// Synthesize user text through `client`
///
/// Trims the text, refuses empty input and enforces the length cap before
/// the client is ever called.
pub fn synthesize(client: &dyn SpeechClient, text: &str, voice: Voice) -> Result<Synthesized> {
    let prepared = text::prepare_for_synthesis(text);
    if prepared.text.is_empty() {
        return Err(ReadAloudError::Other(
            "Please enter some text or open a document.".to_string(),
        ));
    }
    if prepared.truncated {
        info!("Text truncated to {} characters before synthesis", MAX_TEXT_LENGTH);
    }

    let audio = client.synthesize(&prepared.text, voice)?;
    Ok(Synthesized {
        audio,
        truncated: prepared.truncated,
    })
}
