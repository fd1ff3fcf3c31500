//! Configuration management

use crate::speech::client::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::speech::Voice;
use crate::{ReadAloudError, Result};
use ini::Ini;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Application configuration
///
/// Persistent settings for synthesis, playback and display, stored as an
/// INI file in the home directory.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path (~/.readaloud.cfg)
    path: PathBuf,
}

impl Config {
    /// Load configuration from disk or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(path)
                .map_err(|e| ReadAloudError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(path)
                .map_err(|e| ReadAloudError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self {
            ini,
            path: path.to_path_buf(),
        })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| ReadAloudError::Config(format!("Failed to save config: {}", e)))
    }

    /// Get config file path (~/.readaloud.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".readaloud.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("synthesis"))
            .set("voice", Voice::default().name())
            .set("model", DEFAULT_MODEL)
            .set("endpoint", DEFAULT_ENDPOINT)
            .set("api_key_env", "GEMINI_API_KEY")
            .set("timeout", "120");

        ini.with_section(Some("playback"))
            .set("skip_seconds", "10")
            .set("volume", "100")
            .set("auto_play", "true");

        ini.with_section(Some("display"))
            .set("visualizer", "true")
            .set("fps", "30");

        ini
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get an integer value from config
    pub fn get_int(&self, section: &str, key: &str, default: i32) -> i32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Get a float value from config
    pub fn get_float(&self, section: &str, key: &str, default: f32) -> f32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    // Synthesis settings

    /// Voice used for new generations
    pub fn voice(&self) -> Voice {
        let name = self.get_string("synthesis", "voice", Voice::default().name());
        name.parse().unwrap_or_else(|e| {
            warn!("{} in config, using {}", e, Voice::default());
            Voice::default()
        })
    }

    pub fn set_voice(&mut self, voice: Voice) {
        self.set("synthesis", "voice", voice.name());
    }

    /// Synthesis model name
    pub fn model(&self) -> String {
        self.get_string("synthesis", "model", DEFAULT_MODEL)
    }

    /// API root URL
    pub fn endpoint(&self) -> String {
        self.get_string("synthesis", "endpoint", DEFAULT_ENDPOINT)
    }

    /// Name of the environment variable holding the API key
    pub fn api_key_env(&self) -> String {
        self.get_string("synthesis", "api_key_env", "GEMINI_API_KEY")
    }

    /// Request timeout in seconds
    pub fn request_timeout(&self) -> u64 {
        self.get_int("synthesis", "timeout", 120).max(1) as u64
    }

    // Playback settings

    /// Seconds moved by the skip keys
    pub fn skip_seconds(&self) -> f64 {
        let secs = self.get_float("playback", "skip_seconds", 10.0);
        if secs > 0.0 {
            secs as f64
        } else {
            10.0
        }
    }

    /// Output volume (0-100)
    pub fn volume(&self) -> u8 {
        self.get_int("playback", "volume", 100).clamp(0, 100) as u8
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.set("playback", "volume", &volume.min(100).to_string());
    }

    /// Start playing as soon as generated audio is loaded
    pub fn auto_play(&self) -> bool {
        self.get_bool("playback", "auto_play", true)
    }

    // Display settings

    /// Draw the spectrum visualizer
    pub fn visualizer(&self) -> bool {
        self.get_bool("display", "visualizer", true)
    }

    /// Redraw rate of the UI
    pub fn fps(&self) -> u32 {
        self.get_int("display", "fps", 30).clamp(1, 120) as u32
    }
}
