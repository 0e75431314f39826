//! API handlers for the pdfsuite server
//!
//! Binary payloads travel as base64 strings. Document work runs on the
//! blocking pool; fonts are fetched before the flatten pass starts.

use axum::{extract::State, http::StatusCode, Json};
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document;
use pdfsuite_core::{
    command::{execute, output_file_name, OutputKind, PdfCommand, ProcessMetrics, ProcessResult},
    coords::PageBox,
    fonts::required_font_urls,
    text::DEFAULT_MAX_PAGES,
    ImageInput, OverlayElement, PdfSuiteError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::gemini::build_prompt;
use crate::AppState;

/// Decode a base64 field, tolerating a `data:...;base64,` prefix
fn decode_field(field: &str, value: &str) -> Result<Vec<u8>, ServerError> {
    let payload = match value.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => value,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ServerError::InvalidRequest(format!("'{}' is not valid base64: {}", field, e)))
}

/// Run a core command off the async runtime; failed commands answer 422
async fn run_command(command: PdfCommand) -> Result<(StatusCode, Json<ProcessResult>), ServerError> {
    let result = tokio::task::spawn_blocking(move || execute(command)).await?;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(result)))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdfsuite-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Extracted document text
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Handler: POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    if req.message.trim().is_empty() {
        return Err(ServerError::InvalidRequest("message is required".into()));
    }
    let prompt = build_prompt(&req.message, req.context.as_deref());
    info!(
        message_len = req.message.len(),
        has_context = req.context.is_some(),
        "Chat request"
    );

    let response = state.generator.generate(&prompt).await.map_err(|e| {
        warn!("Chat generation failed: {}", e);
        e
    })?;
    Ok(Json(ChatResponse { response }))
}

#[derive(Deserialize)]
pub struct InfoRequest {
    pub file: String,
}

#[derive(Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize)]
pub struct InfoResponse {
    pub success: bool,
    pub page_count: u32,
    pub pages: Vec<PageInfo>,
}

/// Handler: POST /api/info
pub async fn handle_info(Json(req): Json<InfoRequest>) -> Result<Json<InfoResponse>, ServerError> {
    let bytes = decode_field("file", &req.file)?;
    let pages = tokio::task::spawn_blocking(move || -> Result<Vec<PageInfo>, PdfSuiteError> {
        let doc =
            Document::load_mem(&bytes).map_err(|e| PdfSuiteError::ParseError(e.to_string()))?;
        Ok(doc
            .get_pages()
            .iter()
            .map(|(num, id)| {
                let page_box = PageBox::for_page(&doc, *id);
                PageInfo {
                    page: *num,
                    width: page_box.width,
                    height: page_box.height,
                }
            })
            .collect())
    })
    .await??;

    Ok(Json(InfoResponse {
        success: true,
        page_count: pages.len() as u32,
        pages,
    }))
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub files: Vec<String>,
}

/// Handler: POST /api/merge
pub async fn handle_merge(
    Json(req): Json<MergeRequest>,
) -> Result<(StatusCode, Json<ProcessResult>), ServerError> {
    if req.files.is_empty() {
        return Err(ServerError::InvalidRequest("files must not be empty".into()));
    }
    let files = req
        .files
        .iter()
        .enumerate()
        .map(|(i, f)| decode_field(&format!("files[{}]", i), f))
        .collect::<Result<Vec<_>, _>>()?;
    run_command(PdfCommand::Merge { files }).await
}

#[derive(Deserialize)]
pub struct SplitRequest {
    pub file: String,
    #[serde(default)]
    pub file_name: String,
    pub ranges: String,
}

/// Handler: POST /api/split
pub async fn handle_split(
    Json(req): Json<SplitRequest>,
) -> Result<(StatusCode, Json<ProcessResult>), ServerError> {
    if req.ranges.trim().is_empty() {
        return Err(ServerError::InvalidRequest("ranges is required".into()));
    }
    run_command(PdfCommand::Split {
        file: decode_field("file", &req.file)?,
        file_name: req.file_name,
        ranges: req.ranges,
    })
    .await
}

#[derive(Deserialize)]
pub struct FileRequest {
    pub file: String,
    #[serde(default)]
    pub file_name: String,
}

/// Handler: POST /api/compress
pub async fn handle_compress(
    Json(req): Json<FileRequest>,
) -> Result<(StatusCode, Json<ProcessResult>), ServerError> {
    run_command(PdfCommand::Compress {
        file: decode_field("file", &req.file)?,
        file_name: req.file_name,
    })
    .await
}

/// Handler: POST /api/csv-to-pdf
pub async fn handle_csv_to_pdf(
    Json(req): Json<FileRequest>,
) -> Result<(StatusCode, Json<ProcessResult>), ServerError> {
    run_command(PdfCommand::CsvToPdf {
        file: decode_field("file", &req.file)?,
        file_name: req.file_name,
    })
    .await
}

/// Handler: POST /api/xlsx-to-pdf
pub async fn handle_xlsx_to_pdf(
    Json(req): Json<FileRequest>,
) -> Result<(StatusCode, Json<ProcessResult>), ServerError> {
    run_command(PdfCommand::XlsxToPdf {
        file: decode_field("file", &req.file)?,
        file_name: req.file_name,
    })
    .await
}

#[derive(Deserialize)]
pub struct ImagePayload {
    pub name: String,
    pub data: String,
}

#[derive(Deserialize)]
pub struct ImagesRequest {
    pub images: Vec<ImagePayload>,
}

/// Handler: POST /api/images-to-pdf
pub async fn handle_images_to_pdf(
    Json(req): Json<ImagesRequest>,
) -> Result<(StatusCode, Json<ProcessResult>), ServerError> {
    if req.images.is_empty() {
        return Err(ServerError::InvalidRequest("images must not be empty".into()));
    }
    let images = req
        .images
        .into_iter()
        .map(|img| {
            Ok(ImageInput {
                data: decode_field(&img.name, &img.data)?,
                name: img.name,
            })
        })
        .collect::<Result<Vec<_>, ServerError>>()?;
    run_command(PdfCommand::ImagesToPdf { images }).await
}

#[derive(Deserialize)]
pub struct EditRequest {
    pub file: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub elements: Vec<OverlayElement>,
}

/// Handler: POST /api/edit
pub async fn handle_edit(
    State(state): State<AppState>,
    Json(req): Json<EditRequest>,
) -> Result<Json<ProcessResult>, ServerError> {
    let bytes = decode_field("file", &req.file)?;
    let urls = required_font_urls(&req.elements, &state.catalog);
    let fonts = state.fonts.prefetch(&urls).await;
    debug!(
        elements = req.elements.len(),
        fonts_needed = urls.len(),
        fonts_ready = fonts.len(),
        "Edit request"
    );

    let started = std::time::Instant::now();
    let input_size_bytes = bytes.len();
    let catalog = state.catalog.clone();
    let elements = req.elements;
    let (output, page_count) = tokio::task::spawn_blocking(move || {
        let output =
            pdfsuite_core::flatten_elements(&bytes, &elements, &catalog, &fonts)?;
        let page_count = pdfsuite_core::get_page_count(&output.data)?;
        Ok::<_, PdfSuiteError>((output, page_count))
    })
    .await??;

    let metrics = ProcessMetrics {
        input_size_bytes,
        output_size_bytes: output.data.len(),
        page_count,
        processing_time_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        drawn = output.report.drawn,
        skipped = output.report.skipped.len(),
        "Flattened overlay"
    );
    let report = serde_json::to_value(&output.report)
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok(Json(ProcessResult::ok(
        &output.data,
        output_file_name(OutputKind::Edited, &req.file_name),
        metrics,
        Some(report),
    )))
}

#[derive(Deserialize)]
pub struct ExtractTextRequest {
    pub file: String,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

#[derive(Serialize)]
pub struct ExtractTextResponse {
    pub success: bool,
    pub text: String,
    /// Pages read
    pub pages: u32,
    pub page_count: u32,
}

/// Handler: POST /api/extract-text
pub async fn handle_extract_text(
    Json(req): Json<ExtractTextRequest>,
) -> Result<Json<ExtractTextResponse>, ServerError> {
    let bytes = decode_field("file", &req.file)?;
    let max_pages = req.max_pages.unwrap_or(DEFAULT_MAX_PAGES);
    let extracted =
        tokio::task::spawn_blocking(move || pdfsuite_core::extract_text(&bytes, max_pages))
            .await??;

    Ok(Json(ExtractTextResponse {
        success: true,
        text: extracted.text,
        pages: extracted.pages_read,
        page_count: extracted.page_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_field_accepts_data_url() {
        assert_eq!(decode_field("f", "data:application/pdf;base64,AQID").unwrap(), vec![1, 2, 3]);
        assert_eq!(decode_field("f", "AQID").unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            decode_field("f", "***"),
            Err(ServerError::InvalidRequest(_))
        ));
    }
}
