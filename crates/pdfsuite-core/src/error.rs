use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfSuiteError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Font error: {0}")]
    FontError(String),
}
