//! Voice menu handler
//!
//! Modal handler for choosing a synthesis voice (v).

use super::{HandlerAction, KeyHandler};
use crate::speech::Voice;
use crate::state::State;
use crate::Result;
use log::debug;

/// Voice menu key handler
///
/// - 1-5: choose the voice at that position and leave
/// - Enter/Esc: leave without changing anything
pub struct VoiceMenuHandler {
    /// Voice selected when the menu opened
    current: Voice,
}

impl VoiceMenuHandler {
    pub fn new(current: Voice) -> Self {
        Self { current }
    }
}

impl KeyHandler for VoiceMenuHandler {
    fn process_with_context(&mut self, key: &[u8], state: &mut State) -> Result<HandlerAction> {
        match key {
            b"\r" | b"\n" | b"\x1b" | b"q" => {
                debug!("Voice menu: exit");
                Ok(HandlerAction::Remove)
            }
            [digit @ b'1'..=b'9'] => match Voice::from_menu_index((digit - b'0') as usize) {
                Some(voice) => {
                    debug!("Voice menu: {}", voice);
                    state.set_voice(voice)?;
                    Ok(HandlerAction::Remove)
                }
                None => Ok(HandlerAction::Handled),
            },
            _ => Ok(HandlerAction::Handled),
        }
    }

    /// One line per voice, the current one marked with `▸`
    fn prompt(&self) -> Option<String> {
        let mut lines = vec!["Choose a voice (1-5, Esc to cancel)".to_string()];
        lines.extend(Voice::ALL.iter().map(|&v| {
            format!(
                "{} {} {:<7} {:<7} {}",
                if v == self.current { '▸' } else { ' ' },
                v.menu_index(),
                v.name(),
                v.gender(),
                v.description()
            )
        }));
        Some(lines.join("\n"))
    }
}
