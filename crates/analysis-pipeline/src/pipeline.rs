use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clause_engine::{
    ClauseClassifier, DeterministicClassifier, OpenAiRefinementService, RefinementService,
    Segmenter,
};
use document_loader::{looks_like_legal_document, DocumentLoader, Upload};
use risk_engine::RiskScorer;
use shared_types::{AnalysisReport, Clause, DocumentFormat, RequestContext};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AnalyzerConfig, ConfigurationError};
use crate::error::AnalysisError;

pub const NOT_LEGAL_WARNING: &str =
    "Text does not look like a legal document; results may be unreliable";

/// Loader → Segmenter → Classifier → Scorer for one document at a time.
///
/// Holds only immutable configuration; every call gets its own
/// [`RequestContext`], so one pipeline serves concurrent requests.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    loader: DocumentLoader,
    segmenter: Segmenter,
    classifier: ClauseClassifier,
    scorer: RiskScorer,
    min_text_chars: usize,
    summarize_by_default: bool,
}

impl AnalysisPipeline {
    pub fn new(
        loader: DocumentLoader,
        segmenter: Segmenter,
        classifier: ClauseClassifier,
        scorer: RiskScorer,
    ) -> Self {
        Self {
            loader,
            segmenter,
            classifier,
            scorer,
            min_text_chars: 0,
            summarize_by_default: false,
        }
    }

    /// Build from configuration, reading the refinement API key from the
    /// environment variable the config names.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ConfigurationError> {
        let api_key = env::var(&config.refinement.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self::from_config_with_api_key(config, api_key)
    }

    /// Build from configuration with an explicit API key.
    ///
    /// When refinement is enabled but no key is given, the pipeline runs
    /// deterministic-only and logs a warning.
    pub fn from_config_with_api_key(
        config: &AnalyzerConfig,
        api_key: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let deterministic = DeterministicClassifier::new(config.load_vocabulary()?);
        let mut classifier = ClauseClassifier::new(deterministic, config.refinement_policy());

        if config.refinement.enabled {
            match api_key {
                Some(key) => {
                    let service = OpenAiRefinementService::new(
                        config.refinement.base_url.clone(),
                        config.refinement.model.clone(),
                        key,
                        Duration::from_millis(config.refinement.timeout_ms),
                    )
                    .map_err(|e| ConfigurationError::Invalid {
                        field: "refinement",
                        reason: e.to_string(),
                    })?;
                    info!(
                        model = %config.refinement.model,
                        base_url = %config.refinement.base_url,
                        "Clause refinement enabled"
                    );
                    classifier = classifier.with_service(Arc::new(service));
                }
                None => warn!(
                    env = %config.refinement.api_key_env,
                    "Refinement enabled but no API key set, using deterministic classification only"
                ),
            }
        }

        let scorer = RiskScorer::new(config.load_risk_rules()?);
        let loader = DocumentLoader::new(config.loader.max_upload_bytes);

        Ok(Self {
            min_text_chars: config.loader.min_text_chars,
            summarize_by_default: config.refinement.summarize,
            ..Self::new(loader, Segmenter::new(), classifier, scorer)
        })
    }

    /// Swap in a refinement service, e.g. a local model
    pub fn with_refinement_service(mut self, service: Arc<dyn RefinementService>) -> Self {
        self.classifier = self.classifier.with_service(service);
        self
    }

    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.loader.max_upload_bytes()
    }

    pub fn refinement_active(&self) -> bool {
        self.classifier.refinement_active()
    }

    /// Whether requests that do not ask get summaries
    pub fn summarize_by_default(&self) -> bool {
        self.summarize_by_default
    }

    /// Analyze an uploaded file.
    ///
    /// Loader errors abort the run; nothing after loading can fail.
    pub async fn analyze(
        &self,
        ctx: &RequestContext,
        upload: Upload,
        summarize: bool,
    ) -> Result<AnalysisReport, AnalysisError> {
        let filename = upload.filename.clone();
        let document = self.loader.load(upload).map_err(|err| {
            warn!(request_id = %ctx.request_id, error = %err, "Document rejected");
            AnalysisError::from(err)
        })?;

        Ok(self
            .run(
                ctx,
                filename,
                document.format(),
                document.pages(),
                document.text(),
                summarize,
            )
            .await)
    }

    /// Analyze pasted text; it goes through the same size check and
    /// normalization as a plain-text upload, without signature sniffing.
    pub async fn analyze_text(
        &self,
        ctx: &RequestContext,
        text: &str,
        summarize: bool,
    ) -> Result<AnalysisReport, AnalysisError> {
        let document = self.loader.load_text(text).map_err(|err| {
            warn!(request_id = %ctx.request_id, error = %err, "Text rejected");
            AnalysisError::from(err)
        })?;

        Ok(self
            .run(
                ctx,
                None,
                document.format(),
                document.pages(),
                document.text(),
                summarize,
            )
            .await)
    }

    async fn run(
        &self,
        ctx: &RequestContext,
        filename: Option<String>,
        format: DocumentFormat,
        pages: u32,
        text: &str,
        summarize: bool,
    ) -> AnalysisReport {
        let document_id = Uuid::new_v4().to_string();

        let mut warnings = Vec::new();
        if !looks_like_legal_document(text, self.min_text_chars) {
            warn!(request_id = %ctx.request_id, %document_id, "Text does not look like a contract");
            warnings.push(NOT_LEGAL_WARNING.to_string());
        }

        let segments = self.segmenter.segment(text);
        let mode = segments.mode();
        let mut clauses: Vec<Clause> = segments.collect();

        self.classifier.classify_all(&mut clauses, summarize).await;
        let profile = self.scorer.assess(&mut clauses);

        info!(
            request_id = %ctx.request_id,
            user_id = %ctx.user_id,
            %document_id,
            %format,
            ?mode,
            clauses = clauses.len(),
            aggregate = %profile.aggregate,
            missing = profile.missing_essential.len(),
            "Analysis complete"
        );

        AnalysisReport {
            document_id,
            filename,
            format,
            pages,
            analyzed_at: Utc::now(),
            clauses,
            profile,
            warnings,
            refinement_active: self.classifier.refinement_active(),
        }
    }
}
