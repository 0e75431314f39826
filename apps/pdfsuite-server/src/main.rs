//! pdfsuite server
//!
//! HTTP surface for the PDF utility suite:
//!
//! - Document chat, proxied to a hosted text model
//! - Merge, split, compress and page info
//! - Image and CSV conversion to PDF
//! - Overlay edits flattened into the document
//!
//! Document work is synchronous and runs on tokio's blocking pool. External
//! fonts are downloaded before a flatten pass and cached for the life of the
//! process.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use pdfsuite_core::FontCatalog;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod fonts;
mod gemini;
#[cfg(test)]
mod tests;

use api::{
    handle_chat, handle_compress, handle_csv_to_pdf, handle_edit, handle_extract_text,
    handle_health, handle_images_to_pdf, handle_info, handle_merge, handle_split,
    handle_xlsx_to_pdf,
};
use fonts::FontFetcher;
use gemini::{GeminiClient, TextGenerator, DEFAULT_MODEL};

#[derive(Parser, Debug)]
#[command(name = "pdfsuite-server")]
#[command(about = "PDF utility suite server: document tools, overlay editing and chat")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Largest accepted request body in megabytes
    #[arg(long, default_value = "100")]
    body_limit_mb: usize,

    /// API key for the chat model
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Chat model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    gemini_model: String,

    /// JSON font catalog replacing the built-in one
    #[arg(long, env = "PDFSUITE_FONT_CATALOG")]
    font_catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn TextGenerator>,
    pub catalog: Arc<FontCatalog>,
    pub fonts: FontFetcher,
}

/// All routes, without the per-IP limiter (it needs peer addresses)
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/chat", post(handle_chat))
        .route("/api/info", post(handle_info))
        .route("/api/merge", post(handle_merge))
        .route("/api/split", post(handle_split))
        .route("/api/compress", post(handle_compress))
        .route("/api/edit", post(handle_edit))
        .route("/api/images-to-pdf", post(handle_images_to_pdf))
        .route("/api/csv-to-pdf", post(handle_csv_to_pdf))
        .route("/api/xlsx-to-pdf", post(handle_xlsx_to_pdf))
        .route("/api/extract-text", post(handle_extract_text))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn load_catalog(path: Option<&PathBuf>) -> anyhow::Result<FontCatalog> {
    let Some(path) = path else {
        return Ok(FontCatalog::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read font catalog {}", path.display()))?;
    let catalog = FontCatalog::from_json(&json)
        .with_context(|| format!("Invalid font catalog {}", path.display()))?;
    Ok(catalog)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pdfsuite server on {}:{}", args.host, args.port);

    let catalog = load_catalog(args.font_catalog.as_ref())?;
    info!("Font catalog: {} families", catalog.fonts.len());

    let generator = GeminiClient::new(args.gemini_api_key.clone(), args.gemini_model.clone());
    if !generator.is_configured() {
        warn!("GEMINI_API_KEY not set; /api/chat will fail until it is configured");
    }

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .context("Failed to create rate limiter config")?,
    );

    let state = AppState {
        generator: Arc::new(generator),
        catalog: Arc::new(catalog),
        fonts: FontFetcher::new(),
    };

    let app = router(state, args.body_limit_mb * 1024 * 1024).layer(GovernorLayer {
        config: governor_conf,
    });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Chat model: {}", args.gemini_model);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
