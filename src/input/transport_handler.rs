//! Base key handler for the player
//!
//! Maps single keys to transport, text and settings commands. Sits below
//! every modal handler and sees whatever they pass through.

use super::buffer_handler::BufferHandler;
use super::voice_handler::VoiceMenuHandler;
use super::{HandlerAction, KeyAction, KeyHandler};
use crate::state::State;
use crate::Result;
use log::{debug, trace};
use std::collections::HashMap;

/// Default key handler for player commands
pub struct TransportHandler {
    /// Key bindings map
    keymap: HashMap<Vec<u8>, KeyAction>,
}

impl TransportHandler {
    pub fn new(keymap: HashMap<Vec<u8>, KeyAction>) -> Self {
        debug!("Creating transport handler with {} bindings", keymap.len());
        Self { keymap }
    }

    /// Look up and run the action bound to `key`
    ///
    /// Unbound keys are passed through and ignored by the caller.
    pub fn process_key(&mut self, key: &[u8], state: &mut State) -> Result<HandlerAction> {
        match self.keymap.get(key).copied() {
            Some(action) => {
                trace!("Key action: {:?}", action);
                self.execute_action(action, state)?;
                Ok(HandlerAction::Handled)
            }
            None => Ok(HandlerAction::Passthrough),
        }
    }

    fn execute_action(&mut self, action: KeyAction, state: &mut State) -> Result<()> {
        use KeyAction::*;

        match action {
            PlayPause => state.toggle_play_pause(),
            Stop => {
                state.stop();
                Ok(())
            }
            SkipBack => {
                let step = state.config.skip_seconds();
                state.skip(-step)
            }
            SkipForward => {
                let step = state.config.skip_seconds();
                state.skip(step)
            }
            SeekStart => state.seek_to_start(),
            JumpTo => {
                if state.controller.has_buffer() {
                    debug!("Entering jump input");
                    state.handlers.push(Box::new(BufferHandler::new(
                        "Jump to (seconds or m:ss)",
                        Box::new(|input: String, state: &mut State| state.jump_to(&input)),
                    )));
                }
                Ok(())
            }

            Generate => state.generate(),
            OpenFile => {
                debug!("Entering open-file input");
                state.handlers.push(Box::new(BufferHandler::new(
                    "Open file",
                    Box::new(|input: String, state: &mut State| state.open_file(&input)),
                )));
                Ok(())
            }
            Paste => state.paste_clipboard(),

            VoiceMenu => {
                debug!("Entering voice menu");
                let menu = VoiceMenuHandler::new(state.voice());
                state.handlers.push(Box::new(menu));
                Ok(())
            }
            VolumeUp => state.volume_up(),
            VolumeDown => state.volume_down(),

            DismissNotice => {
                state.clear_notice();
                Ok(())
            }

            Quit => {
                debug!("Quit requested");
                state.quit = true;
                Ok(())
            }
        }
    }
}

impl KeyHandler for TransportHandler {
    fn process_with_context(&mut self, key: &[u8], state: &mut State) -> Result<HandlerAction> {
        self.process_key(key, state)
    }
}
