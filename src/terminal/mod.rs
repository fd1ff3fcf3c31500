//! Terminal handling and drawing
//!
//! Raw mode setup and the full-screen player view.

pub mod util;
pub mod view;

pub use util::{
    enter_alternate_screen, get_terminal_size, leave_alternate_screen, restore_termios,
    set_raw_mode,
};
pub use view::{format_time, render};
