//! External refinement service port
//!
//! The refinement pass asks an outside text-classification/summarization
//! service for a second opinion on weakly classified clauses. The service is
//! untrusted: every call returns an explicit `Result` and the classifier
//! decides what to do with a failure.

use async_trait::async_trait;
use shared_types::ClauseCategory;
use thiserror::Error;

/// Why a refinement call produced nothing usable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("refinement service timed out after {0} ms")]
    Timeout(u64),

    #[error("refinement service unavailable: {0}")]
    Unavailable(String),

    #[error("refinement service rate limited")]
    RateLimited,

    #[error("malformed refinement response: {0}")]
    MalformedResponse(String),

    #[error("refinement is disabled")]
    Disabled,
}

impl ServiceError {
    /// The service itself is down or refusing work, as opposed to one bad
    /// answer. Further calls in the same run would fail the same way.
    pub fn is_outage(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout(_) | ServiceError::Unavailable(_) | ServiceError::RateLimited
        )
    }
}

/// Label proposed by the refinement service
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedLabel {
    pub category: ClauseCategory,
    pub confidence: f32,
    pub key_terms: Vec<String>,
}

impl RefinedLabel {
    /// Reject labels a well-behaved service would never send
    pub fn validate(self) -> Result<Self, ServiceError> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ServiceError::MalformedResponse(format!(
                "confidence {} outside 0..=1",
                self.confidence
            )));
        }
        Ok(self)
    }
}

/// Outside classification/summarization service
#[async_trait]
pub trait RefinementService: Send + Sync {
    /// Short identifier for logs, e.g. the model name
    fn name(&self) -> &str;

    async fn classify(&self, clause_text: &str) -> Result<RefinedLabel, ServiceError>;

    /// Plain-language rewrite of a clause
    async fn summarize(&self, clause_text: &str) -> Result<String, ServiceError>;
}

/// First `max_chars` characters of `text`, cut on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
