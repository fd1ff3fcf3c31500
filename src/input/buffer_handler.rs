//! Buffer handler for collecting text input
//!
//! Used when the player needs a line from the user
//! (a file path to open, a time to jump to)

use super::{HandlerAction, KeyHandler};
use crate::state::State;
use crate::Result;
use log::debug;

/// Callback function type for when input is complete
type OnAcceptFn = Box<dyn FnOnce(String, &mut State) -> Result<()> + Send>;

/// Handler that collects text input until Enter is pressed
///
/// When user presses Enter, calls the provided callback with the collected
/// text. Esc drops the input without calling it.
pub struct BufferHandler {
    /// Label shown before the input
    label: String,

    /// Accumulated input buffer
    buffer: String,

    /// Callback to execute when Enter is pressed
    on_accept: Option<OnAcceptFn>,
}

impl BufferHandler {
    /// Create a new buffer handler
    ///
    /// The callback will be invoked with the collected text when user presses Enter
    pub fn new(label: &str, on_accept: OnAcceptFn) -> Self {
        Self {
            label: label.to_string(),
            buffer: String::new(),
            on_accept: Some(on_accept),
        }
    }
}

impl KeyHandler for BufferHandler {
    fn process_with_context(&mut self, key: &[u8], state: &mut State) -> Result<HandlerAction> {
        // Bare Esc cancels; longer escape sequences (arrows etc.) are ignored
        if key.first() == Some(&0x1b) {
            if key.len() == 1 {
                debug!("BufferHandler: cancelled");
                return Ok(HandlerAction::Remove);
            }
            return Ok(HandlerAction::Handled);
        }

        let Ok(text) = std::str::from_utf8(key) else {
            return Ok(HandlerAction::Handled);
        };

        for ch in text.chars() {
            match ch {
                '\r' | '\n' => {
                    debug!("BufferHandler: accepting input '{}'", self.buffer);
                    if let Some(callback) = self.on_accept.take() {
                        callback(std::mem::take(&mut self.buffer), state)?;
                    }
                    return Ok(HandlerAction::Remove);
                }
                '\x08' | '\x7f' => {
                    self.buffer.pop();
                }
                // Ctrl-U clears the line
                '\x15' => self.buffer.clear(),
                c if !c.is_control() => self.buffer.push(c),
                _ => {}
            }
        }
        debug!("BufferHandler: buffer now '{}'", self.buffer);
        Ok(HandlerAction::Handled)
    }

    fn prompt(&self) -> Option<String> {
        Some(format!("{}: {}_", self.label, self.buffer))
    }
}
