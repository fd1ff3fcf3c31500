//! Error types for readaloud

use std::io;
use thiserror::Error;

/// Failure to turn a synthesized payload into samples
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed base64 audio payload: {0}")]
    Base64(String),

    #[error("audio payload has {0} bytes, not a whole number of 16-bit frames")]
    OddLength(usize),
}

/// Main error type for readaloud
#[derive(Error, Debug)]
pub enum ReadAloudError {
    #[error("Audio decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Text extraction error: {0}")]
    Extraction(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio output error: {0}")]
    Audio(String),

    #[error("Invalid seek position: {0}")]
    InvalidSeek(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl ReadAloudError {
    /// Message shown to the user in the status line
    ///
    /// Every failure is recoverable by retrying the action that caused it,
    /// so these read as instructions rather than diagnostics.
    pub fn user_message(&self) -> String {
        match self {
            ReadAloudError::Decode(_) => {
                "Failed to decode audio data. Please try generating again.".to_string()
            }
            ReadAloudError::Synthesis(_) => {
                "Failed to generate speech. Please check your API key or try a shorter text."
                    .to_string()
            }
            ReadAloudError::Extraction(_) => {
                "Failed to process file. Please try again.".to_string()
            }
            ReadAloudError::UnsupportedFormat(_) => {
                "Unsupported file format. Please open PDF or text files.".to_string()
            }
            ReadAloudError::Audio(msg) => format!("Audio output problem: {}", msg),
            ReadAloudError::InvalidSeek(t) => format!("Cannot seek to {:.1}s", t),
            other => other.to_string(),
        }
    }
}

/// Result type alias for readaloud operations
pub type Result<T> = std::result::Result<T, ReadAloudError>;

impl From<String> for ReadAloudError {
    fn from(s: String) -> Self {
        ReadAloudError::Other(s)
    }
}

impl From<&str> for ReadAloudError {
    fn from(s: &str) -> Self {
        ReadAloudError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for ReadAloudError {
    fn from(e: serde_json::Error) -> Self {
        ReadAloudError::Synthesis(format!("JSON error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_converts() {
        let err: ReadAloudError = DecodeError::OddLength(3).into();
        assert!(matches!(err, ReadAloudError::Decode(DecodeError::OddLength(3))));
        assert!(err.user_message().contains("decode"));
    }

    #[test]
    fn test_user_messages_are_single_line() {
        let errors = vec![
            ReadAloudError::Synthesis("boom".into()),
            ReadAloudError::Extraction("bad pdf".into()),
            ReadAloudError::UnsupportedFormat("image/png".into()),
            ReadAloudError::InvalidSeek(-1.0),
            ReadAloudError::Other("plain".into()),
        ];
        for err in errors {
            let msg = err.user_message();
            assert!(!msg.is_empty());
            assert!(!msg.contains('\n'), "{:?} produced a multi-line message", err);
        }
    }
}
