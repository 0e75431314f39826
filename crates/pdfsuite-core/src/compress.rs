//! Lossless PDF size reduction

use lopdf::Document;
use serde::Serialize;
use tracing::info;

use crate::error::PdfSuiteError;

#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compressed_size: usize,
    /// Zero when the rewrite came out larger
    pub saved_bytes: usize,
}

impl CompressionResult {
    /// Saved bytes as a percentage of the original size
    pub fn saved_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        self.saved_bytes as f64 / self.original_size as f64 * 100.0
    }
}

/// Drop unreachable objects and empty streams, then Flate-compress the rest
pub fn compress_document(bytes: &[u8]) -> Result<CompressionResult, PdfSuiteError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| PdfSuiteError::ParseError(e.to_string()))?;

    let pruned = doc.prune_objects().len();
    let empty = doc.delete_zero_length_streams().len();
    doc.compress();

    let mut data = Vec::new();
    doc.save_to(&mut data)
        .map_err(|e| PdfSuiteError::OperationError(format!("Save failed: {}", e)))?;

    let original_size = bytes.len();
    let compressed_size = data.len();
    let saved_bytes = original_size.saturating_sub(compressed_size);
    info!(
        original_size,
        compressed_size, saved_bytes, pruned, empty, "Compressed document"
    );

    Ok(CompressionResult {
        data,
        original_size,
        compressed_size,
        saved_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pdf;
    use lopdf::{Dictionary, Object, Stream};

    /// Test document padded with an unreferenced, highly compressible stream
    fn bloated_pdf() -> Vec<u8> {
        let mut doc = Document::load_mem(&create_test_pdf(2, "Bloat")).unwrap();
        let filler = "0 0 0 rg 0 0 10 10 re f\n".repeat(2000).into_bytes();
        doc.add_object(Object::Stream(Stream::new(Dictionary::new(), filler)));
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_compress_reduces_size() {
        let pdf = bloated_pdf();
        let result = compress_document(&pdf).unwrap();
        assert_eq!(result.original_size, pdf.len());
        assert_eq!(result.compressed_size, result.data.len());
        assert!(result.compressed_size < result.original_size);
        assert_eq!(result.saved_bytes, result.original_size - result.compressed_size);
        assert!(result.saved_percent() > 0.0);
    }

    #[test]
    fn test_compress_keeps_pages() {
        let result = compress_document(&create_test_pdf(3, "Keep")).unwrap();
        let doc = Document::load_mem(&result.data).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_saved_bytes_saturates() {
        let result = CompressionResult {
            data: vec![],
            original_size: 100,
            compressed_size: 120,
            saved_bytes: 100usize.saturating_sub(120),
        };
        assert_eq!(result.saved_bytes, 0);
        assert_eq!(result.saved_percent(), 0.0);
    }

    #[test]
    fn test_compress_invalid_input() {
        assert!(matches!(
            compress_document(b"%PDF-nope"),
            Err(PdfSuiteError::ParseError(_))
        ));
    }
}
