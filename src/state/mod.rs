//! Application state management
//!
//! The State struct is the central data structure for the reader, holding
//! configuration, the loaded text, the playback controller, the pending
//! synthesis request and UI state.

pub mod config;

use crate::audio::{AudioController, AudioEngine, PlaybackState};
use crate::document;
use crate::input::HandlerStack;
use crate::speech::{self, text, SpeechClient, Synthesized, Voice};
use crate::{ReadAloudError, Result};
use config::Config;
use log::{debug, error, info, warn};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

/// Volume change per key press, in percent
pub const VOLUME_STEP: u8 = 10;

/// Message shown on the notice line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(s) | Notice::Error(s) => s,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

/// Main application state for the reader
///
/// Persists across the event loop. Everything here runs on the UI thread
/// except the synthesis request, which reports back through `pending`.
pub struct State {
    /// Configuration loaded from ~/.readaloud.cfg
    pub config: Config,

    /// Playback of the most recently generated audio
    pub controller: AudioController,

    /// Remote synthesis client; `None` when no API key is available
    client: Option<Arc<dyn SpeechClient>>,

    /// Text to be read aloud
    text: String,

    /// Voice for the next generation
    voice: Voice,

    /// In-flight synthesis request
    pending: Option<Receiver<Result<Synthesized>>>,

    /// Set by the controller's completion callback, cleared by `tick`
    ended: Rc<Cell<bool>>,

    /// Latest user-facing message
    notice: Option<Notice>,

    /// Key handler stack for modal input
    /// Voice menu and line input push onto this
    pub handlers: HandlerStack,

    /// Set when the user asks to quit
    pub quit: bool,
}

impl State {
    /// Create the application state around an audio engine and client
    pub fn new(
        config: Config,
        engine: Box<dyn AudioEngine>,
        client: Option<Arc<dyn SpeechClient>>,
    ) -> Self {
        let ended = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ended);
        let mut controller = AudioController::new(engine, move || flag.set(true));
        controller.set_volume(config.volume() as f32 / 100.0);

        let voice = config.voice();
        info!("State initialized with voice {}", voice);
        if client.is_none() {
            warn!("No synthesis client; generation disabled");
        }

        Self {
            config,
            controller,
            client,
            text: String::new(),
            voice,
            pending: None,
            ended,
            notice: None,
            handlers: HandlerStack::new(),
            quit: false,
        }
    }

    /// Save configuration to disk
    ///
    /// Called when the user changes voice or volume
    pub fn save_config(&self) -> Result<()> {
        self.config.save()
    }

    // ========== Text ==========

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text, enforcing the length cap
    pub fn set_text(&mut self, raw: &str) {
        let capped = text::truncate_chars(&text::normalize(raw), speech::MAX_TEXT_LENGTH);
        debug!("Text set ({} chars)", text::char_count(&capped.text));
        self.notice = capped.notice().map(Notice::Info);
        self.text = capped.text;
    }

    /// Read a PDF or text file into the text area
    pub fn open_file(&mut self, input: &str) -> Result<()> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }
        let path = expand_home(input);
        info!("Opening {}", path.display());

        let extracted = document::extract_file(&path)?;
        self.text = extracted.text.clone();
        self.notice = Some(Notice::Info(extracted.notice().unwrap_or_else(|| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| input.to_string());
            format!("Loaded {}", name)
        })));
        Ok(())
    }

    /// Replace the text with the clipboard contents
    pub fn paste_clipboard(&mut self) -> Result<()> {
        let pasted = crate::clipboard::get_from_clipboard()?;
        if pasted.trim().is_empty() {
            self.set_info("Clipboard is empty");
            return Ok(());
        }
        self.set_text(&pasted);
        if self.notice.is_none() {
            self.set_info("Pasted from clipboard");
        }
        Ok(())
    }

    // ========== Voice ==========

    pub fn voice(&self) -> Voice {
        self.voice
    }

    /// Choose the voice for the next generation and remember it
    pub fn set_voice(&mut self, voice: Voice) -> Result<()> {
        info!("Voice set to {}", voice);
        self.voice = voice;
        self.config.set_voice(voice);
        self.set_info(&format!("Voice: {} ({})", voice, voice.description()));
        self.save_config()
    }

    // ========== Synthesis ==========

    /// Whether a synthesis request is in flight
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Start synthesizing the current text in the background
    ///
    /// Refused while another request is in flight. Playback stops first.
    pub fn generate(&mut self) -> Result<()> {
        if self.is_loading() {
            debug!("Generate ignored: request already in flight");
            return Ok(());
        }
        if self.text.trim().is_empty() {
            return Err(ReadAloudError::Other(
                "Please enter some text or open a document.".to_string(),
            ));
        }
        let client = match &self.client {
            Some(client) => Arc::clone(client),
            None => {
                return Err(ReadAloudError::Config(format!(
                    "API key not found. Set {} in the environment.",
                    self.config.api_key_env()
                )))
            }
        };

        self.controller.stop();

        let (tx, rx) = mpsc::channel();
        let text = self.text.clone();
        let voice = self.voice;
        info!("Generating speech with voice {}", voice);

        thread::Builder::new()
            .name("synthesis".to_string())
            .spawn(move || {
                let result = speech::synthesize(client.as_ref(), &text, voice);
                if tx.send(result).is_err() {
                    debug!("Synthesis finished after the UI went away");
                }
            })?;

        self.pending = Some(rx);
        self.set_info("Generating speech...");
        Ok(())
    }

    /// Install a finished synthesis result
    fn finish_synthesis(&mut self, result: Result<Synthesized>) {
        let synthesized = match result {
            Ok(s) => s,
            Err(e) => {
                self.report_error(&e);
                return;
            }
        };

        match self.controller.load_audio(&synthesized.audio) {
            Ok(duration) => {
                info!("Loaded {:.1}s of audio", duration);
                self.notice = Some(Notice::Info(if synthesized.truncated {
                    text::truncation_notice()
                } else {
                    "Speech ready".to_string()
                }));
                if self.config.auto_play() {
                    if let Err(e) = self.controller.play(None) {
                        self.report_error(&e);
                    }
                }
            }
            Err(e) => self.report_error(&e),
        }
    }

    // ========== Playback ==========

    /// Play when paused or stopped, pause when playing
    pub fn toggle_play_pause(&mut self) -> Result<()> {
        if !self.controller.has_buffer() {
            self.set_info("Nothing to play yet. Press g to generate.");
            return Ok(());
        }
        if self.controller.is_playing() {
            self.controller.pause();
            Ok(())
        } else {
            self.controller.play(None)
        }
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    /// Move the play head by `delta` seconds, clamped to the buffer
    pub fn skip(&mut self, delta: f64) -> Result<()> {
        if !self.controller.has_buffer() {
            return Ok(());
        }
        let target = (self.controller.current_time() + delta).clamp(0.0, self.controller.duration());
        debug!("Skip {:+.1}s to {:.2}", delta, target);
        self.controller.seek(target)
    }

    pub fn seek_to_start(&mut self) -> Result<()> {
        self.controller.seek(0.0)
    }

    /// Seek to a typed position (`90`, `1:30` or `1.5`)
    pub fn jump_to(&mut self, input: &str) -> Result<()> {
        if input.trim().is_empty() {
            return Ok(());
        }
        match parse_time(input) {
            Some(secs) => self.controller.seek(secs),
            None => Err(ReadAloudError::Other(format!(
                "Could not read '{}' as a time",
                input.trim()
            ))),
        }
    }

    /// Current volume in percent
    pub fn volume(&self) -> u8 {
        self.config.volume()
    }

    pub fn volume_up(&mut self) -> Result<()> {
        self.set_volume(self.volume().saturating_add(VOLUME_STEP).min(100))
    }

    pub fn volume_down(&mut self) -> Result<()> {
        self.set_volume(self.volume().saturating_sub(VOLUME_STEP))
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        debug!("Volume {}%", volume);
        self.config.set_volume(volume);
        self.controller.set_volume(volume as f32 / 100.0);
        self.save_config()
    }

    // ========== Event loop ==========

    /// Advance non-input work: engine events and synthesis results
    ///
    /// Called once per frame by the main loop.
    pub fn tick(&mut self) {
        self.controller.process_events();
        if self.ended.replace(false) {
            info!("Playback finished");
            self.set_info("Finished");
        }

        let polled = match &self.pending {
            Some(rx) => rx.try_recv(),
            None => return,
        };
        match polled {
            Ok(result) => {
                self.pending = None;
                self.finish_synthesis(result);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                error!("Synthesis worker exited without a result");
                self.notice = Some(Notice::Error(
                    "Failed to generate speech. Please try again.".to_string(),
                ));
            }
        }
    }

    // ========== Notices ==========

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_info(&mut self, msg: &str) {
        self.notice = Some(Notice::Info(msg.to_string()));
    }

    /// Show an error on the notice line
    pub fn report_error(&mut self, err: &ReadAloudError) {
        error!("{}", err);
        self.notice = Some(Notice::Error(err.user_message()));
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Short label for the playback line
    pub fn status_label(&self) -> &'static str {
        if self.is_loading() {
            return "Generating";
        }
        match self.controller.state() {
            PlaybackState::Empty => "No audio",
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }
}

/// Parse `90`, `1.5` or `1:30` into seconds
pub fn parse_time(input: &str) -> Option<f64> {
    let input = input.trim();
    let secs = match input.split_once(':') {
        Some((m, s)) => {
            let minutes: u32 = m.trim().parse().ok()?;
            let seconds: f64 = s.trim().parse().ok()?;
            if !(0.0..60.0).contains(&seconds) {
                return None;
            }
            minutes as f64 * 60.0 + seconds
        }
        None => input.parse().ok()?,
    };
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

/// Expand a leading `~/` to the home directory
fn expand_home(input: &str) -> PathBuf {
    match input.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(input)),
        None => PathBuf::from(input),
    }
}
