//! Playback controller
//!
//! Owns one decoded buffer and drives single-use source nodes on an
//! [`AudioEngine`]. Nodes cannot be repositioned once started, so every
//! pause and seek tears the current node down and starts a fresh one. The
//! controller hides that churn by tracking logical time itself:
//!
//! - while playing, `elapsed = engine clock - start_time`
//! - while not playing, `elapsed = pause_offset`
//!
//! No counter ticks anywhere; the engine clock is the only time source.

use super::{
    decode_pcm_base64, Analyser, AudioBuffer, AudioEngine, EngineEvent, EngineState, NodeId,
    StartedNode,
};
use crate::{ReadAloudError, Result};
use log::{debug, info, trace};
use std::sync::Arc;

/// Callback invoked when playback reaches the end on its own
type OnEndedFn = Box<dyn FnMut()>;

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No buffer loaded
    Empty,
    /// Buffer loaded, positioned at the start
    Stopped,
    /// A node is producing output
    Playing,
    /// Buffer loaded, positioned at `pause_offset`
    Paused,
}

/// Audio playback controller
///
/// One instance per session. It is the only owner of the engine and of the
/// active node; dropping it stops playback and releases the device.
pub struct AudioController {
    engine: Box<dyn AudioEngine>,
    buffer: Option<Arc<AudioBuffer>>,
    state: PlaybackState,

    /// Live node for the current play segment, `Some` only while playing.
    /// Completion events are matched against this id, so a node that was
    /// stopped by hand can never be mistaken for one that ran out.
    active_node: Option<NodeId>,

    /// Engine time at which offset 0 would have played
    start_time: f64,

    /// Resume point while not playing
    pause_offset: f64,

    on_ended: OnEndedFn,
}

impl AudioController {
    /// Create a controller over `engine`
    ///
    /// `on_ended` fires once each time playback runs off the end of the
    /// buffer, and never for a user-initiated pause or stop.
    pub fn new(engine: Box<dyn AudioEngine>, on_ended: impl FnMut() + 'static) -> Self {
        Self {
            engine,
            buffer: None,
            state: PlaybackState::Empty,
            active_node: None,
            start_time: 0.0,
            pause_offset: 0.0,
            on_ended: Box::new(on_ended),
        }
    }

    /// Decode a base64 PCM payload and make it the current buffer
    ///
    /// Returns the new duration in seconds. A payload that fails to decode
    /// leaves the current session untouched.
    pub fn load_audio(&mut self, payload: &str) -> Result<f64> {
        let buffer = decode_pcm_base64(payload)?;
        Ok(self.load_buffer(buffer))
    }

    /// Replace the current buffer
    pub fn load_buffer(&mut self, buffer: AudioBuffer) -> f64 {
        self.teardown_node();

        let duration = buffer.duration();
        self.buffer = Some(Arc::new(buffer));
        self.pause_offset = 0.0;
        self.start_time = 0.0;
        self.state = PlaybackState::Stopped;
        self.engine.analyser().reset();

        info!("Loaded {:.2}s of audio", duration);
        duration
    }

    /// Start or resume playback
    ///
    /// `None` resumes from the pause point; `Some(t)` starts at `t`. While
    /// already playing, `Some(t)` seeks and `None` does nothing. Without a
    /// buffer this is a no-op.
    pub fn play(&mut self, offset: Option<f64>) -> Result<()> {
        let Some(buffer) = self.buffer.clone() else {
            debug!("play() ignored: no buffer loaded");
            return Ok(());
        };

        if self.state == PlaybackState::Playing {
            return match offset {
                Some(t) => self.seek(t),
                None => Ok(()),
            };
        }

        if let Some(t) = offset {
            self.check_position(t)?;
        }

        // Output may be gated until the first user action
        if self.engine.state() == EngineState::Suspended {
            debug!("Resuming suspended engine");
            self.engine.resume()?;
        }

        if let Some(t) = offset {
            self.pause_offset = t;
        }
        self.start_node(buffer)
    }

    /// Pause playback, remembering the position
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }

        let elapsed = (self.engine.current_time() - self.start_time).clamp(0.0, self.duration());
        self.teardown_node();
        self.pause_offset = elapsed;
        self.state = PlaybackState::Paused;
        debug!("Paused at {:.3}s", elapsed);
    }

    /// Stop playback and rewind to the start
    ///
    /// Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.teardown_node();
        self.pause_offset = 0.0;
        if self.buffer.is_some() && self.state != PlaybackState::Stopped {
            debug!("Stopped");
            self.state = PlaybackState::Stopped;
        }
    }

    /// Move the play position to `time` seconds
    ///
    /// Playing stays playing from the new position; any other loaded state
    /// becomes paused there. Positions outside `[0, duration]` are rejected
    /// without touching the session; clamping is the caller's job.
    pub fn seek(&mut self, time: f64) -> Result<()> {
        let Some(buffer) = self.buffer.clone() else {
            debug!("seek() ignored: no buffer loaded");
            return Ok(());
        };
        self.check_position(time)?;

        if self.state == PlaybackState::Playing {
            self.pause_offset = time;
            self.start_node(buffer)
        } else {
            self.pause_offset = time;
            self.state = PlaybackState::Paused;
            debug!("Seeked to {:.3}s while not playing", time);
            Ok(())
        }
    }

    /// Playback position in seconds
    pub fn current_time(&self) -> f64 {
        match self.state {
            PlaybackState::Playing => self.engine.current_time() - self.start_time,
            _ => self.pause_offset,
        }
    }

    /// Length of the loaded buffer in seconds, 0 without one
    pub fn duration(&self) -> f64 {
        self.buffer.as_ref().map(|b| b.duration()).unwrap_or(0.0)
    }

    /// Current lifecycle state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether a node is currently producing output
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Whether a buffer is loaded
    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    /// Read-only tap into the live signal
    ///
    /// Only meaningful while playing; otherwise it reads stale or silent data.
    pub fn analyser(&self) -> &Analyser {
        self.engine.analyser()
    }

    /// State of the underlying engine
    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    /// Set output gain (0.0 to 1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
    }

    /// Handle notifications from the engine
    ///
    /// Call once per tick. A natural end of the active node returns the
    /// controller to `Stopped` and fires the end-of-playback callback; ends
    /// reported for nodes that are no longer active are dropped.
    pub fn process_events(&mut self) {
        for event in self.engine.poll_events() {
            match event {
                EngineEvent::Ended(id) if self.active_node == Some(id) => {
                    self.active_node = None;
                    self.pause_offset = 0.0;
                    self.state = PlaybackState::Stopped;
                    info!("Playback finished");
                    (self.on_ended)();
                }
                EngineEvent::Ended(id) => {
                    trace!("Ignoring end of inactive node {:?}", id);
                }
            }
        }
    }

    fn check_position(&self, time: f64) -> Result<()> {
        if time.is_finite() && time >= 0.0 && time <= self.duration() {
            Ok(())
        } else {
            Err(ReadAloudError::InvalidSeek(time))
        }
    }

    /// Replace the active node with one starting at `pause_offset`
    fn start_node(&mut self, buffer: Arc<AudioBuffer>) -> Result<()> {
        self.teardown_node();

        let offset = self.pause_offset;
        match self.engine.start_source(buffer, offset) {
            Ok(StartedNode { id, started_at }) => {
                self.start_time = started_at - offset;
                self.active_node = Some(id);
                self.state = PlaybackState::Playing;
                debug!("Node {:?} playing from {:.3}s", id, offset);
                Ok(())
            }
            Err(e) => {
                self.state = PlaybackState::Paused;
                Err(e)
            }
        }
    }

    fn teardown_node(&mut self) {
        if let Some(id) = self.active_node.take() {
            self.engine.stop_source(id);
        }
    }
}

impl Drop for AudioController {
    fn drop(&mut self) {
        debug!("Disposing playback controller");
        self.teardown_node();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ManualClock, SilentEngine};
    use std::cell::Cell;
    use std::rc::Rc;

    fn controller() -> (AudioController, ManualClock, Rc<Cell<usize>>) {
        let clock = ManualClock::new();
        let ended = Rc::new(Cell::new(0));
        let counter = ended.clone();
        let engine = SilentEngine::with_clock(clock.clone());
        let controller = AudioController::new(Box::new(engine), move || {
            counter.set(counter.get() + 1)
        });
        (controller, clock, ended)
    }

    fn two_seconds() -> AudioBuffer {
        AudioBuffer::mono(1000, vec![0.0; 2000])
    }

    #[test]
    fn test_empty_controller() {
        let (mut controller, _, _) = controller();
        assert_eq!(controller.state(), PlaybackState::Empty);
        assert_eq!(controller.duration(), 0.0);

        controller.play(None).unwrap();
        controller.pause();
        controller.stop();
        controller.seek(1.0).unwrap();
        assert_eq!(controller.state(), PlaybackState::Empty);
        assert_eq!(controller.current_time(), 0.0);
    }

    #[test]
    fn test_play_resumes_suspended_engine() {
        let (mut controller, _, _) = controller();
        controller.load_buffer(two_seconds());
        assert_eq!(controller.engine_state(), EngineState::Suspended);

        controller.play(None).unwrap();
        assert_eq!(controller.engine_state(), EngineState::Running);
        assert!(controller.is_playing());
    }

    #[test]
    fn test_load_resets_session() {
        let (mut controller, clock, ended) = controller();
        controller.load_buffer(two_seconds());
        controller.play(None).unwrap();
        clock.advance(0.7);

        let duration = controller.load_buffer(AudioBuffer::mono(1000, vec![0.0; 500]));
        assert_eq!(duration, 0.5);
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert_eq!(controller.current_time(), 0.0);

        // The torn-down node must not report an end later
        clock.advance(5.0);
        controller.process_events();
        assert_eq!(ended.get(), 0);
    }

    #[test]
    fn test_failed_decode_keeps_buffer() {
        let (mut controller, _, _) = controller();
        controller.load_buffer(two_seconds());
        controller.seek(1.25).unwrap();

        assert!(controller.load_audio("%%%").is_err());
        assert_eq!(controller.duration(), 2.0);
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert_eq!(controller.current_time(), 1.25);
    }

    #[test]
    fn test_invalid_seek_rejected() {
        let (mut controller, _, _) = controller();
        controller.load_buffer(two_seconds());
        controller.seek(0.5).unwrap();

        for bad in [-0.1, 2.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                controller.seek(bad),
                Err(ReadAloudError::InvalidSeek(_))
            ));
        }
        assert_eq!(controller.current_time(), 0.5);
        assert_eq!(controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_play_with_offset_while_playing_seeks() {
        let (mut controller, clock, _) = controller();
        controller.load_buffer(two_seconds());
        controller.play(None).unwrap();
        clock.advance(0.3);

        controller.play(Some(1.5)).unwrap();
        assert!(controller.is_playing());
        assert!((controller.current_time() - 1.5).abs() < 1e-9);

        // Plain play() while playing changes nothing
        clock.advance(0.1);
        controller.play(None).unwrap();
        assert!((controller.current_time() - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_pause_past_end_clamps() {
        let (mut controller, clock, ended) = controller();
        controller.load_buffer(two_seconds());
        controller.play(None).unwrap();

        clock.advance(3.0);
        controller.pause();
        assert_eq!(controller.current_time(), 2.0);

        controller.process_events();
        assert_eq!(ended.get(), 0);
    }
}
