//! PDF split
//!
//! Extracts pages from a PDF by deleting everything not on the keep list.

use std::collections::HashSet;

use lopdf::Document;
use tracing::debug;

use crate::error::PdfSuiteError;
use crate::pages::parse_page_selection;

/// Split a PDF, extracting only the specified pages (1-indexed)
///
/// 1. Validate the requested pages against the document
/// 2. Delete every page not on the keep list
/// 3. Prune objects no longer reachable and compress
pub fn split_document(bytes: &[u8], pages: Vec<u32>) -> Result<Vec<u8>, PdfSuiteError> {
    if pages.is_empty() {
        return Err(PdfSuiteError::InvalidRange("No pages specified".into()));
    }

    if pages.contains(&0) {
        return Err(PdfSuiteError::InvalidRange(
            "Page numbers must be >= 1".into(),
        ));
    }

    let mut doc = Document::load_mem(bytes).map_err(|e| PdfSuiteError::ParseError(e.to_string()))?;
    let page_count = doc.get_pages().len() as u32;

    if let Some(&missing) = pages.iter().find(|&&page| page > page_count) {
        return Err(PdfSuiteError::InvalidRange(format!(
            "Page {} does not exist (document has {} pages)",
            missing, page_count
        )));
    }

    let keep: HashSet<u32> = pages.iter().copied().collect();
    let delete: Vec<u32> = (1..=page_count).filter(|p| !keep.contains(p)).collect();
    debug!(kept = keep.len(), deleted = delete.len(), "Splitting document");

    doc.delete_pages(&delete);
    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfSuiteError::OperationError(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

/// Split using a user selection such as "1,3-5,8"
pub fn split_selection(bytes: &[u8], selection: &str) -> Result<Vec<u8>, PdfSuiteError> {
    let page_count = crate::pages::get_page_count(bytes)?;
    let pages = parse_page_selection(selection, page_count)?
        .into_iter()
        .map(|idx| idx as u32 + 1)
        .collect();
    split_document(bytes, pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;

    fn page_texts(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .keys()
            .map(|num| doc.extract_text(&[*num]).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_split_empty_pages_fails() {
        let pdf = create_test_pdf(5, "Split");
        let result = split_document(&pdf, vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_split_extracts_single_page() {
        let pdf = create_test_pdf(5, "Split");
        let result = split_document(&pdf, vec![1]).unwrap();
        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_split_extracts_multiple_pages() {
        let pdf = create_test_pdf(5, "Split");
        let result = split_document(&pdf, vec![1, 3, 5]).unwrap();
        let texts = page_texts(&result);
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("Split-Page-1"));
        assert!(texts[1].contains("Split-Page-3"));
        assert!(texts[2].contains("Split-Page-5"));
    }

    #[test]
    fn test_split_extracts_range() {
        let pdf = create_test_pdf(10, "Split");
        let result = split_document(&pdf, vec![2, 3, 4, 5]).unwrap();
        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[test]
    fn test_split_invalid_page_number_fails() {
        let pdf = create_test_pdf(5, "Split");
        let result = split_document(&pdf, vec![10]);
        assert!(matches!(result, Err(PdfSuiteError::InvalidRange(_))));
    }

    #[test]
    fn test_split_page_zero_fails() {
        let pdf = create_test_pdf(5, "Split");
        let result = split_document(&pdf, vec![0]);
        assert!(matches!(result, Err(PdfSuiteError::InvalidRange(_))));
    }

    #[test]
    fn test_split_selection_drops_out_of_bounds() {
        let pdf = create_test_pdf(4, "Sel");
        let result = split_selection(&pdf, "2, 4-9").unwrap();
        let texts = page_texts(&result);
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("Sel-Page-2"));
        assert!(texts[1].contains("Sel-Page-4"));
    }

    #[test]
    fn test_split_selection_rejects_empty() {
        let pdf = create_test_pdf(4, "Sel");
        assert!(matches!(
            split_selection(&pdf, "7-9"),
            Err(PdfSuiteError::InvalidRange(_))
        ));
    }
}
