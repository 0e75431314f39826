//! Plain text extraction, used as chat context

use lopdf::Document;
use serde::Serialize;
use tracing::warn;

use crate::error::PdfSuiteError;

/// Pages read when no limit is given
pub const DEFAULT_MAX_PAGES: u32 = 10;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractedText {
    /// One line per page read
    pub text: String,
    pub pages_read: u32,
    pub page_count: u32,
}

/// Extract text from the first `max_pages` pages.
///
/// A page whose text cannot be extracted contributes an empty line.
pub fn extract_text(bytes: &[u8], max_pages: u32) -> Result<ExtractedText, PdfSuiteError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfSuiteError::ParseError(e.to_string()))?;
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;

    let mut text = String::new();
    let mut pages_read = 0;
    for &page_num in pages.keys().take(max_pages as usize) {
        let page_text = match doc.extract_text(&[page_num]) {
            Ok(raw) => raw.split_whitespace().collect::<Vec<_>>().join(" "),
            Err(e) => {
                warn!(page = page_num, "Text extraction failed: {}", e);
                String::new()
            }
        };
        text.push_str(&page_text);
        text.push('\n');
        pages_read += 1;
    }

    Ok(ExtractedText {
        text,
        pages_read,
        page_count,
    })
}
