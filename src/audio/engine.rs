//! Audio engine abstraction
//!
//! An engine owns the output device (or a stand-in for it), a monotonic
//! audio clock and the analyser tap. Playback happens through single-use source nodes: a node starts at
//! an offset into a buffer and can only be stopped, never repositioned.

use super::{Analyser, AudioBuffer};
use crate::Result;
use log::{info, warn};
use std::sync::Arc;

/// Identity of one started source node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// A node that has just been started
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartedNode {
    pub id: NodeId,
    /// Engine time at which the node's first frame is due
    pub started_at: f64,
}

/// Whether the engine clock is advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created but not yet allowed to produce sound
    Suspended,
    /// Producing output, clock advancing
    Running,
}

/// Notifications raised by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The node played to the end of its buffer
    ///
    /// Raised exactly once per node, and never for a node that was
    /// stopped through [`AudioEngine::stop_source`].
    Ended(NodeId),
}

/// Audio engine trait
///
/// Backends implement this to give the playback controller a clock and
/// somewhere to send samples. The controller is the only caller.
pub trait AudioEngine {
    /// Audio clock in seconds
    fn current_time(&self) -> f64;

    /// Current engine state
    fn state(&self) -> EngineState;

    /// Leave the suspended state
    fn resume(&mut self) -> Result<()>;

    /// Start a new node playing `buffer` from `offset` seconds
    ///
    /// The returned start time is read atomically with handing the node to
    /// the output, so the caller's position arithmetic matches what is heard.
    fn start_source(&mut self, buffer: Arc<AudioBuffer>, offset: f64) -> Result<StartedNode>;

    /// Stop a node; unknown or already finished nodes are ignored
    fn stop_source(&mut self, node: NodeId);

    /// Drain pending notifications
    fn poll_events(&mut self) -> Vec<EngineEvent>;

    /// Analyser reading this engine's output
    fn analyser(&self) -> &Analyser;

    /// Output gain (0.0 to 1.0)
    fn set_volume(&mut self, volume: f32);
}

/// Create the best available engine
///
/// Tries the default output device first. Without one (headless machine,
/// CI, no sound server) falls back to a silent engine driven by the system
/// clock, so playback timing and the visualizer still work.
pub fn create_engine() -> Box<dyn AudioEngine> {
    use super::backends::output::DeviceEngine;
    use super::backends::silent::SilentEngine;

    info!("Trying audio output device...");
    match DeviceEngine::new() {
        Ok(engine) => {
            info!("✓ Using audio output device at {} Hz", engine.sample_rate());
            Box::new(engine)
        }
        Err(e) => {
            warn!("✗ Audio output unavailable: {}", e);
            warn!("Falling back to silent playback");
            Box::new(SilentEngine::system())
        }
    }
}
