//! Remote speech synthesis client
//!
//! Sends text to the Gemini `generateContent` endpoint with audio output
//! enabled and returns the base64 PCM payload untouched. Decoding is the
//! playback side's business.

use super::Voice;
use crate::state::config::Config;
use crate::{ReadAloudError, Result};
use log::{debug, error, info};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Model used when the config does not name one
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// API root used when the config does not name one
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable consulted when the configured one is unset
pub const FALLBACK_KEY_ENV: &str = "API_KEY";

/// Speech synthesis client trait
///
/// Implementations turn text into base64-encoded 16-bit PCM (mono,
/// 24 kHz). They are called from a worker thread, hence `Send + Sync`.
pub trait SpeechClient: Send + Sync {
    /// Synthesize `text` with `voice`
    fn synthesize(&self, text: &str, voice: Voice) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    data: String,
}

/// Gemini text-to-speech client
pub struct GeminiClient {
    api_key: String,
    model: String,
    endpoint: String,
    agent: ureq::Agent,
}

impl GeminiClient {
    /// Create a client with an explicit key
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            agent: config.into(),
        }
    }

    /// Create a client from the `[synthesis]` config section
    ///
    /// The key comes from the environment variable the config names,
    /// falling back to `API_KEY`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let key_env = config.api_key_env();
        let api_key = std::env::var(&key_env)
            .or_else(|_| std::env::var(FALLBACK_KEY_ENV))
            .map_err(|_| {
                ReadAloudError::Config(format!(
                    "API key not found. Set {} (or {}) in the environment.",
                    key_env, FALLBACK_KEY_ENV
                ))
            })?;

        info!("Using synthesis model {}", config.model());
        Ok(Self::new(
            api_key,
            config.model(),
            config.endpoint(),
            Duration::from_secs(config.request_timeout()),
        ))
    }

    /// Full `generateContent` URL
    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Request body asking for spoken audio with a prebuilt voice
    pub fn build_request(text: &str, voice: Voice) -> Value {
        json!({
            "contents": [{
                "parts": [{ "text": text }]
            }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": voice.name() }
                    }
                }
            }
        })
    }

    /// Pull the audio payload out of a response body
    pub fn extract_audio(body: &str) -> Result<String> {
        let response: GenerateResponse = serde_json::from_str(body)?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.inline_data)
            .map(|d| d.data)
            .filter(|data| !data.is_empty())
            .ok_or_else(|| {
                ReadAloudError::Synthesis("No audio data received from the API".to_string())
            })
    }
}

impl SpeechClient for GeminiClient {
    fn synthesize(&self, text: &str, voice: Voice) -> Result<String> {
        debug!("Requesting {} chars with voice {}", text.chars().count(), voice);

        let mut resp = self
            .agent
            .post(&self.url())
            .header("x-goog-api-key", self.api_key.as_str())
            .send_json(Self::build_request(text, voice))
            .map_err(|e| match e {
                ureq::Error::StatusCode(401) | ureq::Error::StatusCode(403) => {
                    ReadAloudError::Synthesis("Invalid API key".to_string())
                }
                other => {
                    error!("Synthesis request failed: {}", other);
                    ReadAloudError::Synthesis(format!("Gemini TTS API error: {}", other))
                }
            })?;

        let body = resp
            .body_mut()
            .read_to_string()
            .map_err(|e| ReadAloudError::Synthesis(format!("Failed to read response: {}", e)))?;

        let audio = Self::extract_audio(&body)?;
        debug!("Received {} bytes of base64 audio", audio.len());
        Ok(audio)
    }
}
