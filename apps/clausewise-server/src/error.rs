//! Error types for the ClauseWise server

use analysis_pipeline::AnalysisError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Analysis not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ServerError::Analysis(err) => {
                let status = match err {
                    AnalysisError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    AnalysisError::CorruptDocument { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    AnalysisError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                };
                (status, err.code(), err.to_string())
            }
            ServerError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            ServerError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Analysis '{}' not found", id),
            ),
            ServerError::Store(err) => {
                tracing::error!("Store error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Analysis history is unavailable".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
