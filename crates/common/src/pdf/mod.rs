//! PDF text extraction
//!
//! Extracts text from in-memory PDF bytes using lopdf. Pages that fail to
//! decode are skipped; a document yielding no text at all is an error so
//! the pipeline can stop before any generation call.

use crate::errors::{AppError, Result};
use tracing::{debug, warn};

/// Result of extracting a PDF
#[derive(Debug, Clone)]
pub struct PdfText {
    pub text: String,
    pub page_count: usize,
}

/// Extract text from PDF bytes
pub fn extract_text(bytes: &[u8]) -> Result<PdfText> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| AppError::InvalidFormat {
        message: format!("unreadable PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    let page_count = pages.len();
    debug!(page_count, "Extracting text from PDF");

    let mut text = String::new();
    for (&page_num, _) in pages.iter() {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract page, skipping");
            }
        }
    }

    let cleaned = normalize_whitespace(&text);
    if cleaned.is_empty() {
        return Err(AppError::EmptyExtraction);
    }

    debug!(
        raw_len = text.len(),
        cleaned_len = cleaned.len(),
        "PDF extraction complete"
    );

    Ok(PdfText {
        text: cleaned,
        page_count,
    })
}

/// Collapse runs of whitespace and strip stray control characters
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{FEFF}', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("a   b\n\nc\t d"), "a b c d");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let result = extract_text(b"definitely not a pdf");
        assert!(matches!(result, Err(AppError::InvalidFormat { .. })));
    }
}
