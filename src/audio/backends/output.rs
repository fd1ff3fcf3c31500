// Audio output using cpal
// One stream for the life of the engine; nodes are swapped in and out of
// the shared mixer instead of rebuilding the stream

use crate::audio::analyser::{Analyser, SignalTap, DEFAULT_FFT_SIZE};
use crate::audio::engine::{AudioEngine, EngineEvent, EngineState, NodeId, StartedNode};
use crate::audio::AudioBuffer;
use crate::{ReadAloudError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use log::{debug, error, info};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Source node currently feeding the stream
struct Voice {
    id: NodeId,
    buffer: Arc<AudioBuffer>,
    /// Read position in buffer frames
    position: f64,
    /// Buffer frames consumed per output frame
    step: f64,
}

/// State shared with the audio callback
struct Mixer {
    voice: Option<Voice>,
    volume: f32,
}

pub struct DeviceEngine {
    stream: Stream,
    mixer: Arc<Mutex<Mixer>>,
    frames_rendered: Arc<AtomicU64>,
    sample_rate: u32,
    state: EngineState,
    events: Receiver<EngineEvent>,
    next_id: u64,
    analyser: Analyser,
}

impl DeviceEngine {
    /// Open the default output device
    ///
    /// The stream is built paused; nothing is heard and the clock does not
    /// move until [`AudioEngine::resume`].
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| ReadAloudError::Audio("No output device available".to_string()))?;

        let config = device.default_output_config().map_err(|e| {
            ReadAloudError::Audio(format!("Failed to get default output config: {}", e))
        })?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();
        let stream_config: StreamConfig = config.clone().into();

        let mixer = Arc::new(Mutex::new(Mixer {
            voice: None,
            volume: 1.0,
        }));
        let frames_rendered = Arc::new(AtomicU64::new(0));
        let tap = SignalTap::new(DEFAULT_FFT_SIZE);
        let (tx, rx) = mpsc::channel();

        let shared = CallbackShared {
            mixer: mixer.clone(),
            frames_rendered: frames_rendered.clone(),
            tap: tap.clone(),
            events: tx,
        };

        // Build the output stream based on sample format
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, shared)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, shared)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, shared)?,
            format => {
                return Err(ReadAloudError::Audio(format!(
                    "Unsupported sample format: {:?}",
                    format
                )))
            }
        };

        // Some hosts start streams on creation
        if let Err(e) = stream.pause() {
            debug!("Could not pause new stream: {}", e);
        }

        info!(
            "Output device ready: {} Hz, {} channels",
            sample_rate, channels
        );

        Ok(Self {
            stream,
            mixer,
            frames_rendered,
            sample_rate,
            state: EngineState::Suspended,
            events: rx,
            next_id: 1,
            analyser: Analyser::new(tap, DEFAULT_FFT_SIZE),
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        shared: CallbackShared,
    ) -> Result<Stream> {
        let channels = config.channels.max(1) as usize;
        let mut scratch: Vec<f32> = Vec::with_capacity(4096);

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.clear();
                    {
                        let mut mixer = shared.mixer.lock();
                        let vol = mixer.volume;

                        for frame in data.chunks_mut(channels) {
                            let mut ended = None;
                            let value = match mixer.voice.as_mut() {
                                Some(voice) => {
                                    let value = voice.buffer.sample_at(voice.position);
                                    voice.position += voice.step;
                                    if voice.position >= voice.buffer.frames() as f64 {
                                        ended = Some(voice.id);
                                    }
                                    value
                                }
                                None => 0.0,
                            };

                            if let Some(id) = ended {
                                mixer.voice = None;
                                let _ = shared.events.send(EngineEvent::Ended(id));
                            }

                            scratch.push(value);
                            for sample in frame.iter_mut() {
                                *sample = T::from_sample(value * vol);
                            }
                        }
                        shared
                            .frames_rendered
                            .fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
                    }

                    shared.tap.try_push_samples(&scratch);
                },
                move |err| {
                    error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| ReadAloudError::Audio(format!("Failed to build output stream: {}", e)))?;

        Ok(stream)
    }

    /// Get the output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Everything the audio callback owns a handle to
struct CallbackShared {
    mixer: Arc<Mutex<Mixer>>,
    frames_rendered: Arc<AtomicU64>,
    tap: SignalTap,
    events: Sender<EngineEvent>,
}

impl AudioEngine for DeviceEngine {
    fn current_time(&self) -> f64 {
        self.frames_rendered.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        if self.state == EngineState::Suspended {
            self.stream
                .play()
                .map_err(|e| ReadAloudError::Audio(format!("Failed to start stream: {}", e)))?;
            self.state = EngineState::Running;
            debug!("Output stream resumed");
        }
        Ok(())
    }

    fn start_source(&mut self, buffer: Arc<AudioBuffer>, offset: f64) -> Result<StartedNode> {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let step = buffer.sample_rate() as f64 / self.sample_rate as f64;
        let position = offset.max(0.0) * buffer.sample_rate() as f64;

        let mut mixer = self.mixer.lock();
        if let Some(old) = mixer.voice.take() {
            debug!("Replacing node {:?} with {:?}", old.id, id);
        }
        mixer.voice = Some(Voice {
            id,
            buffer,
            position,
            step,
        });
        // The callback bumps the frame count while holding the mixer, so
        // this reading is the frame the new voice starts on
        let started_at = self.current_time();
        Ok(StartedNode { id, started_at })
    }

    fn stop_source(&mut self, node: NodeId) {
        let mut mixer = self.mixer.lock();
        if mixer.voice.as_ref().map(|v| v.id) == Some(node) {
            mixer.voice = None;
            drop(mixer);
            self.analyser.tap().clear();
            debug!("Node {:?} stopped", node);
        }
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        self.events.try_iter().collect()
    }

    fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    fn set_volume(&mut self, volume: f32) {
        self.mixer.lock().volume = volume.clamp(0.0, 1.0);
    }
}

impl Drop for DeviceEngine {
    fn drop(&mut self) {
        debug!("Shutting down audio output");
        self.mixer.lock().voice = None;
        let _ = self.stream.pause();
    }
}
