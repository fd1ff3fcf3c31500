//! Silent engine backend
//!
//! Plays nothing, but keeps a faithful audio clock and node bookkeeping so
//! the controller behaves exactly as it would against a device. The clock
//! is pluggable: [`SystemClock`] for headless use, [`ManualClock`] when a
//! caller needs to step time deterministically.

use crate::audio::analyser::{Analyser, SignalTap, DEFAULT_FFT_SIZE};
use crate::audio::engine::{AudioEngine, EngineEvent, EngineState, NodeId, StartedNode};
use crate::audio::AudioBuffer;
use crate::Result;
use log::{debug, trace};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Source of monotonic time in seconds
pub trait Clock: Send {
    fn now(&self) -> f64;
}

/// Wall clock measured from construction
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle while the
/// engine owns another.
#[derive(Clone, Default)]
pub struct ManualClock {
    time: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `secs`
    pub fn advance(&self, secs: f64) {
        *self.time.lock() += secs;
    }

    /// Jump to an absolute time
    pub fn set(&self, secs: f64) {
        *self.time.lock() = secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.time.lock()
    }
}

/// A node that is still "playing"
struct SilentNode {
    id: NodeId,
    buffer: Arc<AudioBuffer>,
    offset: f64,
    started_at: f64,
}

impl SilentNode {
    /// Playback position in seconds at engine time `now`
    fn position(&self, now: f64) -> f64 {
        self.offset + (now - self.started_at).max(0.0)
    }

    fn finished(&self, now: f64) -> bool {
        self.position(now) >= self.buffer.duration()
    }
}

/// Engine that renders into the analyser tap only
pub struct SilentEngine {
    clock: Box<dyn Clock>,
    state: EngineState,
    /// Engine time at which the clock was frozen by suspension
    frozen_at: f64,
    /// Total clock time spent suspended
    suspended_total: f64,
    /// Clock reading when the current suspension began
    suspended_since: f64,
    nodes: Vec<SilentNode>,
    next_id: u64,
    analyser: Analyser,
    volume: f32,
}

impl SilentEngine {
    /// Create a silent engine on any clock
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        let suspended_since = clock.now();
        let tap = SignalTap::new(DEFAULT_FFT_SIZE);
        Self {
            clock: Box::new(clock),
            state: EngineState::Suspended,
            frozen_at: 0.0,
            suspended_total: suspended_since,
            suspended_since,
            nodes: Vec::new(),
            next_id: 1,
            analyser: Analyser::new(tap, DEFAULT_FFT_SIZE),
            volume: 1.0,
        }
    }

    /// Create a silent engine on the wall clock
    pub fn system() -> Self {
        Self::with_clock(SystemClock::new())
    }

    /// Current output gain
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Number of nodes currently playing
    pub fn active_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Put the engine back into the suspended state
    pub fn suspend(&mut self) {
        if self.state == EngineState::Running {
            self.frozen_at = self.current_time();
            self.suspended_since = self.clock.now();
            self.state = EngineState::Suspended;
        }
    }

    /// Write the window under the newest node's play head into the tap
    fn render(&mut self, now: f64) {
        let tap = self.analyser.tap();
        let Some(node) = self.nodes.last() else {
            tap.clear();
            return;
        };

        let size = self.analyser.fft_size();
        let rate = node.buffer.sample_rate() as f64;
        let head = node.position(now) * rate;
        let window: Vec<f32> = (0..size)
            .map(|i| node.buffer.sample_at(head - (size - i) as f64))
            .collect();
        tap.push_samples(&window);
    }
}

impl AudioEngine for SilentEngine {
    fn current_time(&self) -> f64 {
        match self.state {
            EngineState::Suspended => self.frozen_at,
            EngineState::Running => self.clock.now() - self.suspended_total,
        }
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        if self.state == EngineState::Suspended {
            let paused_for = self.clock.now() - self.suspended_since;
            self.suspended_total += paused_for;
            self.state = EngineState::Running;
            debug!("Silent engine resumed at {:.3}s", self.current_time());
        }
        Ok(())
    }

    fn start_source(&mut self, buffer: Arc<AudioBuffer>, offset: f64) -> Result<StartedNode> {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let started_at = self.current_time();
        trace!("Silent node {:?} starts at offset {:.3}s", id, offset);
        self.nodes.push(SilentNode {
            id,
            buffer,
            offset: offset.max(0.0),
            started_at,
        });
        Ok(StartedNode { id, started_at })
    }

    fn stop_source(&mut self, node: NodeId) {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != node);
        if self.nodes.len() != before {
            trace!("Silent node {:?} stopped", node);
        }
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        let now = self.current_time();
        let mut events = Vec::new();

        self.nodes.retain(|n| {
            if n.finished(now) {
                events.push(EngineEvent::Ended(n.id));
                false
            } else {
                true
            }
        });

        self.render(now);
        events
    }

    fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (SilentEngine, ManualClock) {
        let clock = ManualClock::new();
        (SilentEngine::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_starts_suspended_with_frozen_clock() {
        let (engine, clock) = engine();
        assert_eq!(engine.state(), EngineState::Suspended);
        clock.advance(5.0);
        assert_eq!(engine.current_time(), 0.0);
    }

    #[test]
    fn test_clock_runs_after_resume() {
        let (mut engine, clock) = engine();
        clock.advance(3.0);
        engine.resume().unwrap();
        assert_eq!(engine.current_time(), 0.0);

        clock.advance(1.5);
        assert!((engine.current_time() - 1.5).abs() < 1e-9);

        engine.suspend();
        clock.advance(10.0);
        assert!((engine.current_time() - 1.5).abs() < 1e-9);

        engine.resume().unwrap();
        clock.advance(0.5);
        assert!((engine.current_time() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_node_ends_once() {
        let (mut engine, clock) = engine();
        engine.resume().unwrap();
        let buffer = Arc::new(AudioBuffer::mono(100, vec![0.0; 100]));
        let id = engine.start_source(buffer, 0.5).unwrap().id;

        clock.advance(0.4);
        assert!(engine.poll_events().is_empty());

        clock.advance(0.2);
        assert_eq!(engine.poll_events(), vec![EngineEvent::Ended(id)]);
        assert!(engine.poll_events().is_empty());
        assert_eq!(engine.active_nodes(), 0);
    }

    #[test]
    fn test_stopped_node_never_ends() {
        let (mut engine, clock) = engine();
        engine.resume().unwrap();
        let buffer = Arc::new(AudioBuffer::mono(100, vec![0.0; 100]));
        let id = engine.start_source(buffer, 0.0).unwrap().id;

        engine.stop_source(id);
        engine.stop_source(id);
        clock.advance(2.0);
        assert!(engine.poll_events().is_empty());
    }

    #[test]
    fn test_render_feeds_tap() {
        let (mut engine, clock) = engine();
        engine.resume().unwrap();
        let buffer = Arc::new(AudioBuffer::mono(1000, vec![0.5; 1000]));
        engine.start_source(buffer, 0.0).unwrap();

        clock.advance(0.5);
        engine.poll_events();

        let mut wave = [0u8; 64];
        engine.analyser().byte_time_domain_data(&mut wave);
        assert!(wave.iter().all(|&b| b == 192));
    }
}
