//! Error types for the pdfsuite server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfsuite_core::PdfSuiteError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Document(#[from] PdfSuiteError),

    /// The text generation backend failed or is not configured
    #[error("{0}")]
    Generation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ServerError::Document(PdfSuiteError::InvalidRange(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_RANGE")
            }
            ServerError::Document(PdfSuiteError::ParseError(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR")
            }
            ServerError::Document(_) => (StatusCode::UNPROCESSABLE_ENTITY, "PROCESSING_FAILED"),
            ServerError::Generation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "GENERATION_FAILED"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("Worker task failed: {}", err))
    }
}
