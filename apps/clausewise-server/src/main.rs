//! ClauseWise Server
//!
//! REST API over the contract analysis pipeline:
//!
//! - Upload analysis (PDF, DOCX, plain text) and pasted-text analysis
//! - Per-user analysis history in SQLite
//!
//! ## Architecture
//!
//! Every request gets its own `RequestContext` from the `X-User-Id` header;
//! the pipeline itself holds only immutable configuration. Middleware adds
//! per-IP rate limiting, CORS, request tracing and a body size limit.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use analysis_pipeline::{AnalysisPipeline, AnalyzerConfig};
use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod store;

use api::{
    handle_analyze, handle_analyze_text, handle_get_analysis, handle_health,
    handle_list_analyses,
};
use store::{AnalysisStore, SqliteAnalysisStore};

/// JSON envelope and base64 overhead on top of the raw upload limit
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Command-line arguments for the ClauseWise server
#[derive(Parser, Debug)]
#[command(name = "clausewise-server")]
#[command(about = "Contract clause analysis and risk scoring server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Analyzer configuration file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database URL; falls back to DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub store: Arc<dyn AnalysisStore>,
}

/// Routes and middleware shared by the binary and tests; no rate limiter
pub fn build_router(state: AppState) -> Router {
    let body_limit = body_limit(state.pipeline.max_upload_bytes());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/analyze", post(handle_analyze))
        .route("/api/analyze/text", post(handle_analyze_text))
        .route("/api/analyses", get(handle_list_analyses))
        .route("/api/analyses/:id", get(handle_get_analysis))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Base64 grows content by 4/3
fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(4)
        .div_ceil(3)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

fn default_database_url() -> String {
    "sqlite:clausewise.db?mode=rwc".to_string()
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

    info!("Starting ClauseWise server on {}:{}", args.host, args.port);

    let config = match &args.config {
        Some(path) => AnalyzerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };
    let pipeline = AnalysisPipeline::from_config(&config).context("Invalid analyzer configuration")?;

    let database_url = args
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(default_database_url);
    let store = SqliteAnalysisStore::connect(&database_url)
        .await
        .context("Failed to open analysis history")?;

    let state = AppState {
        pipeline: Arc::new(pipeline),
        store: Arc::new(store),
    };

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit.saturating_mul(2))
            .finish()
            .context("Failed to create rate limiter config")?,
    );

    let app = build_router(state).layer(GovernorLayer {
        config: governor_conf,
    });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!(
        "Upload limit: {} bytes, refinement {}",
        config.loader.max_upload_bytes,
        if config.refinement.enabled { "enabled" } else { "disabled" }
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
