//! API handlers for the ClauseWise server
//!
//! - `GET  /health`
//! - `POST /api/analyze`        base64 upload
//! - `POST /api/analyze/text`   pasted text
//! - `GET  /api/analyses`       caller's history
//! - `GET  /api/analyses/:id`   one stored report

use analysis_pipeline::{AnalysisError, Upload};
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::request::Parts,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use shared_types::{AnalysisReport, AnalysisSummary, DocumentFormat, RequestContext};
use tracing::{error, info};

use crate::error::ServerError;
use crate::AppState;

/// Header carrying the caller identity set by the upstream auth layer
pub const USER_ID_HEADER: &str = "x-user-id";

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 200;

/// Request-scoped caller context, built from `X-User-Id`
pub struct Caller(pub RequestContext);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = match parts.headers.get(USER_ID_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| ServerError::InvalidRequest("X-User-Id is not valid text".into()))?
                .trim(),
            None => "",
        };
        let user_id = if user_id.is_empty() {
            RequestContext::ANONYMOUS
        } else {
            user_id
        };
        Ok(Caller(RequestContext::new(user_id)))
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub refinement_active: bool,
}

/// Handler: GET /health
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "clausewise-server",
        version: env!("CARGO_PKG_VERSION"),
        refinement_active: state.pipeline.refinement_active(),
    })
}

/// Upload request body
#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub filename: String,
    /// Base64-encoded file content
    pub content: String,
    /// Explicit format ("pdf", "docx", "txt"); overrides the extension
    pub format: Option<String>,
    pub summarize: Option<bool>,
}

/// Text request body
#[derive(Deserialize)]
pub struct AnalyzeTextRequest {
    pub text: String,
    pub summarize: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub report: AnalysisReport,
}

#[derive(Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub analyses: Vec<AnalysisSummary>,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// Handler: POST /api/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, ServerError> {
    let bytes = BASE64
        .decode(req.content.trim())
        .map_err(|e| ServerError::InvalidRequest(format!("Invalid content base64: {}", e)))?;

    info!(
        request_id = %ctx.request_id,
        user_id = %ctx.user_id,
        filename = %req.filename,
        size = bytes.len(),
        "Analyze request"
    );

    let mut upload = Upload::new(req.filename, bytes);
    if let Some(format) = req.format.as_deref() {
        let format = DocumentFormat::from_extension(format.trim_start_matches('.'))
            .ok_or_else(|| AnalysisError::UnsupportedFormat(format.to_string()))?;
        upload = upload.with_format(format);
    }

    let summarize = req
        .summarize
        .unwrap_or_else(|| state.pipeline.summarize_by_default());
    let report = state.pipeline.analyze(&ctx, upload, summarize).await?;

    remember(&state, &ctx, &report).await;
    Ok(Json(AnalysisResponse {
        success: true,
        report,
    }))
}

/// Handler: POST /api/analyze/text
pub async fn handle_analyze_text(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Json(req): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalysisResponse>, ServerError> {
    info!(
        request_id = %ctx.request_id,
        user_id = %ctx.user_id,
        chars = req.text.len(),
        "Analyze text request"
    );

    let summarize = req
        .summarize
        .unwrap_or_else(|| state.pipeline.summarize_by_default());
    let report = state.pipeline.analyze_text(&ctx, &req.text, summarize).await?;

    remember(&state, &ctx, &report).await;
    Ok(Json(AnalysisResponse {
        success: true,
        report,
    }))
}

/// Handler: GET /api/analyses
pub async fn handle_list_analyses(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let analyses = state.store.list(&ctx.user_id, limit).await?;
    let count = analyses.len();

    Ok(Json(HistoryResponse {
        success: true,
        analyses,
        count,
    }))
}

/// Handler: GET /api/analyses/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResponse>, ServerError> {
    let stored = state.store.get(&ctx.user_id, &id).await?;
    let report = stored.ok_or(ServerError::NotFound(id))?;

    Ok(Json(AnalysisResponse {
        success: true,
        report,
    }))
}

/// Save to history. A failed save is logged and does not fail the request.
async fn remember(state: &AppState, ctx: &RequestContext, report: &AnalysisReport) {
    if let Err(err) = state.store.save(&ctx.user_id, report).await {
        error!(
            request_id = %ctx.request_id,
            document_id = %report.document_id,
            error = %err,
            "Failed to save analysis history"
        );
    }
}
