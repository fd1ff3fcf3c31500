//! Key handler system with modal input support

use crate::state::State;
use crate::Result;

/// Action to take after processing a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerAction {
    /// Not consumed; let the handler below (or the transport keys) see it
    Passthrough,
    /// Remove this handler from the stack
    Remove,
    /// Key was handled, do nothing more
    Handled,
}

/// A key handler processes keyboard input
pub trait KeyHandler {
    /// Process one key with access to state
    ///
    /// Called by [`crate::input::dispatch`], which takes the handler off the
    /// stack first so it may push further handlers.
    fn process_with_context(&mut self, key: &[u8], state: &mut State) -> Result<HandlerAction>;

    /// Line shown in place of the key help while this handler is active
    fn prompt(&self) -> Option<String> {
        None
    }
}

/// Stack of key handlers (last one processes input first)
pub struct HandlerStack {
    handlers: Vec<Box<dyn KeyHandler>>,
}

impl HandlerStack {
    /// Create a new handler stack
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Push a handler onto the stack
    pub fn push(&mut self, handler: Box<dyn KeyHandler>) {
        self.handlers.push(handler);
    }

    /// Pop the top handler from the stack
    pub fn pop(&mut self) -> Option<Box<dyn KeyHandler>> {
        self.handlers.pop()
    }

    /// Prompt of the top handler, if it has one
    pub fn prompt(&self) -> Option<String> {
        self.handlers.last().and_then(|h| h.prompt())
    }

    /// Get the number of handlers in the stack
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerStack {
    fn default() -> Self {
        Self::new()
    }
}
