//! Input handling and key bindings
//!
//! The input system uses a stack-based handler architecture where handlers
//! can be pushed/popped to create modal interfaces (voice menu, line input)
//! on top of the transport keys.

pub mod buffer_handler;
pub mod handler;
pub mod keymap;
pub mod transport_handler;
pub mod voice_handler;

pub use buffer_handler::BufferHandler;
pub use handler::{HandlerAction, HandlerStack, KeyHandler};
pub use keymap::{create_default_keymap, KeyAction};
pub use transport_handler::TransportHandler;
pub use voice_handler::VoiceMenuHandler;

use crate::state::State;
use crate::Result;

/// Split one read of terminal input into keys
///
/// A read can carry several keys when a key is held down or text is
/// pasted. Escape sequences (`ESC [ ... final`, `ESC O x`) stay whole, a
/// lone ESC is its own key, and everything else splits per UTF-8 character.
pub fn split_keys(input: &[u8]) -> Vec<&[u8]> {
    let mut keys = Vec::new();
    let mut i = 0;

    while i < input.len() {
        let len = match input[i] {
            0x1b => match input.get(i + 1).copied() {
                None | Some(0x1b) => 1,
                Some(b'[') => input[i + 2..]
                    .iter()
                    .position(|b| (0x40..=0x7e).contains(b))
                    .map(|p| p + 3)
                    .unwrap_or(input.len() - i),
                Some(b'O') => (input.len() - i).min(3),
                // Alt+key
                Some(_) => 2,
            },
            b if b >= 0xf0 => 4,
            b if b >= 0xe0 => 3,
            b if b >= 0xc0 => 2,
            _ => 1,
        };
        let end = (i + len).min(input.len());
        keys.push(&input[i..end]);
        i = end;
    }

    keys
}

/// Route one read of keyboard input, key by key
///
/// Keys are routed in order, so a handler pushed by one key receives the
/// keys after it. Stops at the first error or once quit is requested, and
/// returns the action for the last key routed.
pub fn dispatch(
    input: &[u8],
    state: &mut State,
    base: &mut dyn KeyHandler,
) -> Result<HandlerAction> {
    let mut last = HandlerAction::Passthrough;
    for key in split_keys(input) {
        last = dispatch_key(key, state, base)?;
        if state.quit {
            break;
        }
    }
    Ok(last)
}

/// Route a single key
///
/// The top modal handler sees the key first. It is taken off the stack
/// while it runs so it can borrow the state, then put back unless it asked
/// to be removed. Keys it passes through go to `base`.
pub fn dispatch_key(
    key: &[u8],
    state: &mut State,
    base: &mut dyn KeyHandler,
) -> Result<HandlerAction> {
    if let Some(mut handler) = state.handlers.pop() {
        let depth = state.handlers.len();
        let action = handler.process_with_context(key, state);

        // A failed handler is dropped along with its half-finished input.
        // Handlers pushed by this one (e.g. nested input) stay above it.
        let keep = matches!(action, Ok(HandlerAction::Handled | HandlerAction::Passthrough));
        if keep {
            let above: Vec<_> = std::iter::from_fn(|| {
                (state.handlers.len() > depth).then(|| state.handlers.pop()).flatten()
            })
            .collect();
            state.handlers.push(handler);
            for h in above.into_iter().rev() {
                state.handlers.push(h);
            }
        }

        match action? {
            HandlerAction::Passthrough => {}
            other => return Ok(other),
        }
    }

    base.process_with_context(key, state)
}
