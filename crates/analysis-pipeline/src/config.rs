//! Analyzer configuration
//!
//! TOML with four optional sections. Every field has a default, so an empty
//! file is a valid configuration:
//!
//! ```toml
//! [loader]
//! max_upload_bytes = 26214400
//! min_text_chars = 100
//!
//! [classifier]
//! confidence_threshold = 0.5
//! # vocabulary_path = "rules/vocabulary.toml"
//!
//! [refinement]
//! enabled = false
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_ms = 8000
//! max_input_chars = 4000
//! summarize = false
//!
//! [risk]
//! # rules_path = "rules/risk_rules.toml"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clause_engine::{
    RefinementPolicy, Vocabulary, VocabularyError, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_MAX_INPUT_CHARS, DEFAULT_REFINEMENT_TIMEOUT,
};
use document_loader::DEFAULT_MAX_UPLOAD_BYTES;
use risk_engine::{RiskRules, RuleError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Startup configuration failures. Fatal: the analyzer never starts with a
/// partial rule set.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("vocabulary: {0}")]
    Vocabulary(#[from] VocabularyError),

    #[error("risk rules: {0}")]
    Rules(#[from] RuleError),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub refinement: RefinementConfig,
    #[serde(default)]
    pub risk: RiskConfig,
}

impl AnalyzerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigurationError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.loader.max_upload_bytes == 0 {
            return Err(invalid("loader.max_upload_bytes", "must be positive"));
        }
        let threshold = self.classifier.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid(
                "classifier.confidence_threshold",
                format!("{} is outside 0.0..=1.0", threshold),
            ));
        }
        if self.refinement.timeout_ms == 0 {
            return Err(invalid("refinement.timeout_ms", "must be positive"));
        }
        if self.refinement.max_input_chars == 0 {
            return Err(invalid("refinement.max_input_chars", "must be positive"));
        }
        if self.refinement.enabled && self.refinement.base_url.trim().is_empty() {
            return Err(invalid("refinement.base_url", "required when enabled"));
        }
        Ok(())
    }

    /// The configured vocabulary, or the built-in table
    pub fn load_vocabulary(&self) -> Result<Vocabulary, ConfigurationError> {
        let vocabulary = match &self.classifier.vocabulary_path {
            Some(path) => Vocabulary::from_file(path)?,
            None => Vocabulary::builtin()?,
        };
        Ok(vocabulary)
    }

    /// The configured risk rules, or the built-in table
    pub fn load_risk_rules(&self) -> Result<RiskRules, ConfigurationError> {
        let rules = match &self.risk.rules_path {
            Some(path) => RiskRules::from_file(path)?,
            None => RiskRules::builtin()?,
        };
        Ok(rules)
    }

    pub fn refinement_policy(&self) -> RefinementPolicy {
        RefinementPolicy {
            confidence_threshold: self.classifier.confidence_threshold,
            timeout: Duration::from_millis(self.refinement.timeout_ms),
            max_input_chars: self.refinement.max_input_chars,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Below this many characters the text is reported as not a contract
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            min_text_chars: default_min_text_chars(),
        }
    }
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_min_text_chars() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Deterministic labels below this confidence are sent for refinement
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default)]
    pub vocabulary_path: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            vocabulary_path: None,
        }
    }
}

fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Attach summaries when a request does not say
    #[serde(default)]
    pub summarize: bool,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
            max_input_chars: default_max_input_chars(),
            summarize: false,
        }
    }
}

fn default_base_url() -> String {
    clause_engine::openai::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    clause_engine::openai::DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_REFINEMENT_TIMEOUT.as_millis() as u64
}

fn default_max_input_chars() -> usize {
    DEFAULT_MAX_INPUT_CHARS
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AnalyzerConfig::from_str("").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
        assert_eq!(config.loader.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.classifier.confidence_threshold, 0.5);
        assert!(!config.refinement.enabled);
        assert_eq!(config.refinement.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.refinement.timeout_ms, 8000);
    }

    #[test]
    fn test_partial_sections() {
        let config = AnalyzerConfig::from_str(
            r#"
            [classifier]
            confidence_threshold = 0.7

            [refinement]
            enabled = true
            model = "local-model"
            timeout_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier.confidence_threshold, 0.7);
        assert!(config.refinement.enabled);
        assert_eq!(config.refinement.model, "local-model");
        assert_eq!(config.refinement.max_input_chars, 4000);

        let policy = config.refinement_policy();
        assert_eq!(policy.timeout, Duration::from_millis(1500));
        assert_eq!(policy.confidence_threshold, 0.7);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let err = AnalyzerConfig::from_str("[classifier]\nconfidence_threshold = 1.5").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Invalid {
                field: "classifier.confidence_threshold",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(AnalyzerConfig::from_str("[loader]\nmax_upload_bytes = 0").is_err());
        assert!(AnalyzerConfig::from_str("[refinement]\ntimeout_ms = 0").is_err());
        assert!(AnalyzerConfig::from_str("[refinement]\nmax_input_chars = 0").is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = AnalyzerConfig::from_str("[loader\nmax_upload_bytes = 1").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn test_missing_rule_file_is_a_configuration_error() {
        let config = AnalyzerConfig::from_str(
            "[risk]\nrules_path = \"/nonexistent/clausewise/risk_rules.toml\"",
        )
        .unwrap();
        assert!(matches!(
            config.load_risk_rules().unwrap_err(),
            ConfigurationError::Rules(RuleError::Io { .. })
        ));
        assert!(config.load_vocabulary().is_ok());
    }
}
