//! Audio playback
//!
//! Decoding of synthesized PCM, the engine abstraction with its backends,
//! the analyser tap and the playback controller that ties them together.

pub mod analyser;
pub mod backends;
pub mod buffer;
pub mod controller;
pub mod decoder;
pub mod engine;

pub use analyser::{Analyser, SignalTap};
pub use backends::silent::{Clock, ManualClock, SilentEngine, SystemClock};
pub use buffer::AudioBuffer;
pub use controller::{AudioController, PlaybackState};
pub use decoder::{decode_pcm_base64, encode_pcm_base64, PCM_SAMPLE_RATE};
pub use engine::{create_engine, AudioEngine, EngineEvent, EngineState, NodeId, StartedNode};
