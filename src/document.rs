//! Document text extraction
//!
//! Turns an opened file into plain text for synthesis. PDFs are read with
//! lopdf, limited to the first pages; anything textual is read as UTF-8.

use crate::speech::text::{self, MAX_TEXT_LENGTH};
use crate::{ReadAloudError, Result};
use log::{debug, info, warn};
use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Pages read from a PDF before giving up on the rest
pub const MAX_PDF_PAGES: usize = 10;

/// Separator placed between pages
pub const PAGE_SEPARATOR: &str = "\n\n";

const PDF_MAGIC: &[u8] = b"%PDF-";

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "csv", "log"];

/// Bytes inspected when guessing whether an unknown file is text
const SNIFF_LEN: usize = 4096;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Kinds of documents that can be read aloud
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Work out the kind from the file's first bytes and its extension
    ///
    /// The PDF signature wins over the extension. Files with an unknown or
    /// missing extension are accepted as text when their content is UTF-8.
    pub fn detect(path: &Path, head: &[u8]) -> Result<Self> {
        if head.starts_with(PDF_MAGIC) {
            return Ok(DocumentKind::Pdf);
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            e if TEXT_EXTENSIONS.contains(&e) => Ok(DocumentKind::PlainText),
            _ if looks_like_text(head) => {
                debug!("{} has no known extension but reads as text", path.display());
                Ok(DocumentKind::PlainText)
            }
            _ => Err(ReadAloudError::UnsupportedFormat(format!(
                "{} (expected PDF or text)",
                path.display()
            ))),
        }
    }
}

/// Whether the bytes read as UTF-8 without binary control codes
fn looks_like_text(head: &[u8]) -> bool {
    let sample = &head[..head.len().min(SNIFF_LEN)];
    let text = match std::str::from_utf8(sample) {
        Ok(s) => s,
        // Sample cut inside a multi-byte character
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&sample[..e.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return false,
    };
    !text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0c'))
}

/// Text pulled out of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub kind: DocumentKind,
    pub text: String,
    /// Whether the text was cut to [`MAX_TEXT_LENGTH`]
    pub truncated: bool,
    /// Pages in the PDF, when known
    pub total_pages: Option<usize>,
}

impl ExtractedText {
    /// Notice to show the user, if any
    pub fn notice(&self) -> Option<String> {
        if self.truncated {
            return Some(text::truncation_notice());
        }
        match self.total_pages {
            Some(total) if total > MAX_PDF_PAGES => Some(format!(
                "Only the first {} of {} pages were read.",
                MAX_PDF_PAGES, total
            )),
            _ => None,
        }
    }
}

/// Read a file and extract its text, capped for synthesis
pub fn extract_file(path: &Path) -> Result<ExtractedText> {
    let bytes = std::fs::read(path).map_err(|e| {
        ReadAloudError::Extraction(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let kind = DocumentKind::detect(path, &bytes)?;
    debug!("Extracting {:?} from {}", kind, path.display());

    let (raw, total_pages) = match kind {
        DocumentKind::Pdf => {
            let (text, total) = extract_pdf(&bytes)?;
            (text, Some(total))
        }
        DocumentKind::PlainText => (String::from_utf8_lossy(&bytes).into_owned(), None),
    };

    let capped = text::truncate_chars(&text::normalize(&raw), MAX_TEXT_LENGTH);
    info!(
        "Extracted {} characters from {}{}",
        text::char_count(&capped.text),
        path.display(),
        if capped.truncated { " (truncated)" } else { "" }
    );

    Ok(ExtractedText {
        kind,
        text: capped.text,
        truncated: capped.truncated,
        total_pages,
    })
}

/// Extract text from PDF bytes
///
/// Returns the text of at most [`MAX_PDF_PAGES`] pages and the document's
/// total page count.
pub fn extract_pdf(bytes: &[u8]) -> Result<(String, usize)> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| ReadAloudError::Extraction(format!("Unreadable PDF: {}", e)))?;

    let pages = doc.get_pages();
    let total = pages.len();
    if total > MAX_PDF_PAGES {
        info!("PDF has {} pages, reading the first {}", total, MAX_PDF_PAGES);
    }

    let mut texts = Vec::with_capacity(total.min(MAX_PDF_PAGES));
    for &number in pages.keys().take(MAX_PDF_PAGES) {
        match doc.extract_text(&[number]) {
            Ok(page) => texts.push(page),
            Err(e) => warn!("Skipping page {}: {}", number, e),
        }
    }

    if texts.iter().all(|t| t.trim().is_empty()) && total > 0 {
        return Err(ReadAloudError::Extraction(
            "No extractable text in PDF".to_string(),
        ));
    }

    Ok((join_pages(texts, MAX_PDF_PAGES), total))
}

/// Join page texts, keeping at most `limit` pages
///
/// Whitespace inside a page collapses to single spaces; pages are separated
/// by a blank line. Pages with no text are left out.
pub fn join_pages<I>(pages: I, limit: usize) -> String
where
    I: IntoIterator<Item = String>,
{
    pages
        .into_iter()
        .take(limit)
        .map(|page| WHITESPACE.replace_all(page.trim(), " ").into_owned())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_by_magic() {
        let kind = DocumentKind::detect(&PathBuf::from("scan.bin"), b"%PDF-1.7\n...").unwrap();
        assert_eq!(kind, DocumentKind::Pdf);
    }

    #[test]
    fn test_detect_by_extension() {
        let txt = DocumentKind::detect(&PathBuf::from("notes.TXT"), b"hello").unwrap();
        assert_eq!(txt, DocumentKind::PlainText);
        let md = DocumentKind::detect(&PathBuf::from("README.md"), b"# hi").unwrap();
        assert_eq!(md, DocumentKind::PlainText);
    }

    #[test]
    fn test_unsupported_format() {
        let err = DocumentKind::detect(&PathBuf::from("photo.png"), b"\x89PNG").unwrap_err();
        assert!(matches!(err, ReadAloudError::UnsupportedFormat(_)));

        let err = DocumentKind::detect(&PathBuf::from("blob"), b"\x00\x01\x02").unwrap_err();
        assert!(matches!(err, ReadAloudError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_detect_text_without_extension() {
        let kind = DocumentKind::detect(&PathBuf::from("README"), b"Plain words\n").unwrap();
        assert_eq!(kind, DocumentKind::PlainText);

        // A multi-byte character split by the sniff window still counts
        let mut head = "a".repeat(SNIFF_LEN - 1).into_bytes();
        head.extend_from_slice("é".as_bytes());
        assert!(looks_like_text(&head));
    }

    #[test]
    fn test_join_pages_limit() {
        let pages: Vec<String> = (1..=15).map(|n| format!("Page  {}\n text", n)).collect();
        let joined = join_pages(pages, MAX_PDF_PAGES);

        let parts: Vec<&str> = joined.split(PAGE_SEPARATOR).collect();
        assert_eq!(parts.len(), 10);
        assert_eq!(parts[0], "Page 1 text");
        assert_eq!(parts[9], "Page 10 text");
        assert!(!joined.contains("Page 11"));
    }

    #[test]
    fn test_join_pages_skips_empty_pages() {
        let pages = vec![
            "One".to_string(),
            "  \n ".to_string(),
            "Three".to_string(),
        ];
        assert_eq!(join_pages(pages, MAX_PDF_PAGES), "One\n\nThree");
    }

    #[test]
    fn test_garbage_pdf() {
        let err = extract_pdf(b"%PDF-1.4 this is not really a pdf").unwrap_err();
        assert!(matches!(err, ReadAloudError::Extraction(_)));
    }

    #[test]
    fn test_notice() {
        let extracted = ExtractedText {
            kind: DocumentKind::Pdf,
            text: "x".to_string(),
            truncated: false,
            total_pages: Some(15),
        };
        assert_eq!(
            extracted.notice().as_deref(),
            Some("Only the first 10 of 15 pages were read.")
        );
    }
}
