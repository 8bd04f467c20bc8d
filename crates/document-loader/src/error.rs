use shared_types::DocumentFormat;
use thiserror::Error;

/// Loader failures. All of them are fatal to the analysis: the input itself
/// is at fault, so there is nothing to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
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

impl LoaderError {
    pub(crate) fn corrupt(format: Option<DocumentFormat>, reason: impl Into<String>) -> Self {
        LoaderError::CorruptDocument {
            format,
            reason: reason.into(),
        }
    }
}
