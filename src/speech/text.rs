//! Text preparation before synthesis

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest text sent in one synthesis request, in characters
pub const MAX_TEXT_LENGTH: usize = 5000;

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Text ready for display or synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedText {
    pub text: String,
    /// Whether characters were dropped to fit the cap
    pub truncated: bool,
}

impl PreparedText {
    /// Notice to show when text was cut
    pub fn notice(&self) -> Option<String> {
        self.truncated.then(truncation_notice)
    }
}

/// User-visible explanation of the length cap
pub fn truncation_notice() -> String {
    format!(
        "Text truncated. Maximum length is {} characters.",
        MAX_TEXT_LENGTH
    )
}

/// Cut `text` to at most `max` characters (not bytes)
pub fn truncate_chars(text: &str, max: usize) -> PreparedText {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => PreparedText {
            text: text[..byte_idx].to_string(),
            truncated: true,
        },
        None => PreparedText {
            text: text.to_string(),
            truncated: false,
        },
    }
}

/// Normalize line endings and collapse runs of blank lines
pub fn normalize(text: &str) -> String {
    let unix = text.replace("\r\n", "\n").replace('\r', "\n");
    BLANK_RUNS.replace_all(&unix, "\n\n").into_owned()
}

/// Trim and cap text for a synthesis request
pub fn prepare_for_synthesis(text: &str) -> PreparedText {
    truncate_chars(text.trim(), MAX_TEXT_LENGTH)
}

/// Number of characters, as shown in the `n/5000` counter
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        let text = "héllo wörld";
        let cut = truncate_chars(text, 4);
        assert_eq!(cut.text, "héll");
        assert!(cut.truncated);

        let whole = truncate_chars(text, 100);
        assert_eq!(whole.text, text);
        assert!(!whole.truncated);
        assert_eq!(whole.notice(), None);
    }

    #[test]
    fn test_exact_length_not_truncated() {
        let text = "a".repeat(MAX_TEXT_LENGTH);
        let prepared = prepare_for_synthesis(&text);
        assert!(!prepared.truncated);
        assert_eq!(char_count(&prepared.text), MAX_TEXT_LENGTH);
    }

    #[test]
    fn test_prepare_trims_then_caps() {
        let text = format!("   {}   ", "b".repeat(6000));
        let prepared = prepare_for_synthesis(&text);
        assert!(prepared.truncated);
        assert_eq!(char_count(&prepared.text), MAX_TEXT_LENGTH);
        assert!(prepared.text.starts_with('b'));
        assert_eq!(
            prepared.notice().as_deref(),
            Some("Text truncated. Maximum length is 5000 characters.")
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(normalize("one\n\n\n\n\ntwo"), "one\n\ntwo");
    }
}
