use document_loader::LoaderError;
use shared_types::DocumentFormat;
use thiserror::Error;

/// Per-request analysis failure.
///
/// Only loading can fail; classification and scoring are total. Refinement
/// service failures never reach this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt document: {reason}")]
    CorruptDocument {
        format: Option<DocumentFormat>,
        reason: String,
    },

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
}

impl From<LoaderError> for AnalysisError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::UnsupportedFormat(what) => AnalysisError::UnsupportedFormat(what),
            LoaderError::CorruptDocument { format, reason } => {
                AnalysisError::CorruptDocument { format, reason }
            }
            LoaderError::TooLarge { size, limit } => AnalysisError::TooLarge { size, limit },
        }
    }
}

impl AnalysisError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            AnalysisError::CorruptDocument { .. } => "CORRUPT_DOCUMENT",
            AnalysisError::TooLarge { .. } => "TOO_LARGE",
        }
    }
}
