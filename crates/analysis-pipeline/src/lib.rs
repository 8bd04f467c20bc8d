//! One contract analysis run, end to end.
//!
//! ```text
//! Upload ─► DocumentLoader ─► Segmenter ─► ClauseClassifier ─► RiskScorer ─► AnalysisReport
//! ```
//!
//! Data flows strictly forward. Loader errors abort the run; the classifier
//! contains every refinement failure; the scorer cannot fail.

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{
    AnalyzerConfig, ClassifierConfig, ConfigurationError, LoaderConfig, RefinementConfig,
    RiskConfig,
};
pub use error::AnalysisError;
pub use pipeline::{AnalysisPipeline, NOT_LEGAL_WARNING};

pub use document_loader::Upload;
