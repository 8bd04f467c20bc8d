//! Clause segmentation and classification
//!
//! - [`segmenter`]: lazy split of normalized text into ordered clauses
//! - [`vocabulary`]: category header/keyword table (TOML, data not code)
//! - [`classifier`]: deterministic pass plus optional refinement
//! - [`refinement`]: the external service port and its error type
//! - [`openai`]: refinement over an OpenAI-compatible HTTP API

pub mod classifier;
pub mod openai;
pub mod refinement;
pub mod segmenter;
pub mod vocabulary;

pub use classifier::{
    ClauseClassifier, DeterministicClassifier, RefinementPolicy, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_MAX_INPUT_CHARS, DEFAULT_REFINEMENT_TIMEOUT,
};
pub use openai::OpenAiRefinementService;
pub use refinement::{truncate_chars, RefinedLabel, RefinementService, ServiceError};
pub use segmenter::{reassemble, SegmentationMode, Segmenter, Segments};
pub use vocabulary::{Vocabulary, VocabularyError};
