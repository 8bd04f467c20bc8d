//! Two-tier clause classification
//!
//! The deterministic pass matches clause headings and bodies against the
//! [`Vocabulary`] and is always available. The refinement pass consults a
//! [`RefinementService`] only when the deterministic label is `other` or
//! below the confidence threshold; any service failure leaves the
//! deterministic result in place.

use std::sync::Arc;
use std::time::Duration;

use shared_types::{Classification, ClassificationSource, Clause, ClauseCategory};
use tracing::{debug, warn};

use crate::refinement::{truncate_chars, RefinedLabel, RefinementService, ServiceError};
use crate::vocabulary::{CategoryVocabulary, Vocabulary};

/// Confidence of a heading that matches category vocabulary
pub const HEADER_CONFIDENCE: f32 = 0.9;
/// Body keyword confidence: base + step per distinct hit, capped
const BODY_BASE_CONFIDENCE: f32 = 0.3;
const BODY_STEP_CONFIDENCE: f32 = 0.15;
const BODY_MAX_CONFIDENCE: f32 = 0.8;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_REFINEMENT_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_MAX_INPUT_CHARS: usize = 4000;

/// Keyword/heading classifier with no external dependency
#[derive(Debug, Clone)]
pub struct DeterministicClassifier {
    vocabulary: Vocabulary,
}

struct Candidate<'v> {
    category: ClauseCategory,
    header_hits: Vec<&'v str>,
    body_hits: Vec<&'v str>,
}

impl Candidate<'_> {
    fn rank(&self) -> (bool, usize, usize) {
        (
            !self.header_hits.is_empty(),
            self.header_hits.len(),
            self.body_hits.len(),
        )
    }
}

impl DeterministicClassifier {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn classify(&self, clause: &Clause) -> Classification {
        self.classify_text(clause.heading.as_deref(), &clause.text)
    }

    /// Classify raw text with an optional heading.
    ///
    /// A heading match beats any number of body hits. Among equals the
    /// category listed first in [`ClauseCategory`] wins, so the result never
    /// depends on iteration order.
    pub fn classify_text(&self, heading: Option<&str>, text: &str) -> Classification {
        let mut best: Option<Candidate<'_>> = None;

        for entry in self.vocabulary.entries() {
            let candidate = match_entry(entry, heading, text);
            if candidate.header_hits.is_empty() && candidate.body_hits.is_empty() {
                continue;
            }
            if best.as_ref().map_or(true, |b| candidate.rank() > b.rank()) {
                best = Some(candidate);
            }
        }

        let Some(best) = best else {
            return Classification::other();
        };

        let confidence = if best.header_hits.is_empty() {
            body_confidence(best.body_hits.len())
        } else {
            HEADER_CONFIDENCE
        };

        let mut key_terms: Vec<String> = Vec::new();
        for term in best.header_hits.iter().chain(best.body_hits.iter()) {
            if !key_terms.iter().any(|t| t == term) {
                key_terms.push((*term).to_string());
            }
        }

        Classification {
            category: best.category,
            confidence,
            source: ClassificationSource::Deterministic,
            key_terms,
        }
    }
}

fn match_entry<'v>(
    entry: &'v CategoryVocabulary,
    heading: Option<&str>,
    text: &str,
) -> Candidate<'v> {
    let header_hits = match heading {
        Some(heading) => entry
            .headers
            .iter()
            .filter(|t| t.is_match(heading))
            .map(|t| t.term())
            .collect(),
        None => Vec::new(),
    };
    let body_hits = entry
        .keywords
        .iter()
        .filter(|t| t.is_match(text))
        .map(|t| t.term())
        .collect();

    Candidate {
        category: entry.category,
        header_hits,
        body_hits,
    }
}

fn body_confidence(hits: usize) -> f32 {
    (BODY_BASE_CONFIDENCE + BODY_STEP_CONFIDENCE * hits as f32).min(BODY_MAX_CONFIDENCE)
}

/// When and how the refinement pass runs
#[derive(Debug, Clone)]
pub struct RefinementPolicy {
    /// Deterministic results below this confidence are sent for refinement
    pub confidence_threshold: f32,
    pub timeout: Duration,
    /// Longer clause text is truncated before it is sent
    pub max_input_chars: usize,
}

impl Default for RefinementPolicy {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            timeout: DEFAULT_REFINEMENT_TIMEOUT,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

/// Deterministic classifier plus optional refinement service
#[derive(Clone)]
pub struct ClauseClassifier {
    deterministic: DeterministicClassifier,
    service: Option<Arc<dyn RefinementService>>,
    policy: RefinementPolicy,
}

impl ClauseClassifier {
    pub fn new(deterministic: DeterministicClassifier, policy: RefinementPolicy) -> Self {
        Self {
            deterministic,
            service: None,
            policy,
        }
    }

    pub fn with_service(mut self, service: Arc<dyn RefinementService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn deterministic(&self) -> &DeterministicClassifier {
        &self.deterministic
    }

    pub fn policy(&self) -> &RefinementPolicy {
        &self.policy
    }

    pub fn refinement_active(&self) -> bool {
        self.service.is_some()
    }

    pub fn needs_refinement(&self, classification: &Classification) -> bool {
        classification.category == ClauseCategory::Other
            || classification.confidence < self.policy.confidence_threshold
    }

    /// Classify one clause. Never fails: refinement errors are logged and
    /// the deterministic result is returned unchanged.
    pub async fn classify(&self, clause: &Clause) -> Classification {
        let baseline = self.deterministic.classify(clause);
        if !self.needs_refinement(&baseline) {
            return baseline;
        }

        let refined = self.refine(clause).await;
        settle_label(clause, baseline, refined)
    }

    /// Ask the refinement service for a label, bounded by the policy timeout
    pub async fn refine(&self, clause: &Clause) -> Result<RefinedLabel, ServiceError> {
        let service = self.service.as_ref().ok_or(ServiceError::Disabled)?;
        let input = truncate_chars(&clause.text, self.policy.max_input_chars);

        let label = self.bounded(service.classify(input)).await??;
        label.validate()
    }

    /// Plain-language summary, or `None` when the service is absent or fails
    pub async fn summarize(&self, clause: &Clause) -> Option<String> {
        settle_summary(clause, self.request_summary(clause).await)
    }

    async fn request_summary(&self, clause: &Clause) -> Result<String, ServiceError> {
        let service = self.service.as_ref().ok_or(ServiceError::Disabled)?;
        let input = truncate_chars(&clause.text, self.policy.max_input_chars);

        self.bounded(service.summarize(input)).await?
    }

    /// Classify every clause in place, optionally attaching summaries.
    /// Clause order and count are preserved.
    ///
    /// After the first outage (timeout, unavailable, rate limited) the
    /// service is not called again for the remaining clauses, so one
    /// document waits on at most one timeout.
    pub async fn classify_all(&self, clauses: &mut [Clause], summarize: bool) {
        let mut outage = false;

        for clause in clauses.iter_mut() {
            let baseline = self.deterministic.classify(clause);
            let classification = if !outage && self.needs_refinement(&baseline) {
                let refined = self.refine(clause).await;
                outage = trips_outage(clause, refined.as_ref().err());
                settle_label(clause, baseline, refined)
            } else {
                baseline
            };
            clause.apply_classification(classification);

            if summarize {
                clause.summary = if outage {
                    None
                } else {
                    let summary = self.request_summary(clause).await;
                    outage = trips_outage(clause, summary.as_ref().err());
                    settle_summary(clause, summary)
                };
            }
        }
    }

    async fn bounded<F, T>(&self, call: F) -> Result<T, ServiceError>
    where
        F: std::future::Future<Output = T>,
    {
        tokio::time::timeout(self.policy.timeout, call)
            .await
            .map_err(|_| ServiceError::Timeout(self.policy.timeout.as_millis() as u64))
    }
}

fn settle_label(
    clause: &Clause,
    baseline: Classification,
    refined: Result<RefinedLabel, ServiceError>,
) -> Classification {
    match refined {
        Ok(label) if label.category == ClauseCategory::Other => {
            debug!(clause_index = clause.index, "Refinement found no better label");
            baseline
        }
        Ok(label) => {
            debug!(
                clause_index = clause.index,
                from = %baseline.category,
                to = %label.category,
                confidence = label.confidence,
                "Accepted refined label"
            );
            let key_terms = if label.key_terms.is_empty() {
                baseline.key_terms
            } else {
                label.key_terms
            };
            Classification {
                category: label.category,
                confidence: label.confidence,
                source: ClassificationSource::Refined,
                key_terms,
            }
        }
        Err(ServiceError::Disabled) => baseline,
        Err(err) => {
            warn!(
                clause_index = clause.index,
                error = %err,
                "Refinement failed, keeping deterministic label"
            );
            baseline
        }
    }
}

fn settle_summary(clause: &Clause, summary: Result<String, ServiceError>) -> Option<String> {
    match summary {
        Ok(summary) if !summary.trim().is_empty() => Some(summary.trim().to_string()),
        Ok(_) => {
            warn!(clause_index = clause.index, "Refinement service returned an empty summary");
            None
        }
        Err(ServiceError::Disabled) => None,
        Err(err) => {
            warn!(clause_index = clause.index, error = %err, "Summary unavailable");
            None
        }
    }
}

fn trips_outage(clause: &Clause, err: Option<&ServiceError>) -> bool {
    match err {
        Some(err) if err.is_outage() => {
            warn!(
                clause_index = clause.index,
                error = %err,
                "Refinement service down, skipping it for the rest of the document"
            );
            true
        }
        _ => false,
    }
}

impl std::fmt::Debug for ClauseClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClauseClassifier")
            .field("service", &self.service.as_ref().map(|s| s.name()))
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared_types::TextSpan;

    fn classifier() -> DeterministicClassifier {
        DeterministicClassifier::new(Vocabulary::builtin().unwrap())
    }

    fn clause(text: &str, heading: Option<&str>) -> Clause {
        Clause::new(0, text, TextSpan { start: 0, end: text.len() })
            .with_heading(heading.map(str::to_string))
    }

    #[test]
    fn test_heading_match_is_high_confidence() {
        let result = classifier().classify(&clause(
            "Governing law: State of Delaware.",
            Some("Governing law"),
        ));
        assert_eq!(result.category, ClauseCategory::GoverningLaw);
        assert_eq!(result.confidence, HEADER_CONFIDENCE);
        assert_eq!(result.key_terms, vec!["governing law"]);
    }

    #[test]
    fn test_heading_beats_body_keywords() {
        let result = classifier().classify(&clause(
            "Indemnification: Client shall indemnify and hold harmless Vendor for unlimited liability.",
            Some("Indemnification"),
        ));
        assert_eq!(result.category, ClauseCategory::Indemnification);
        assert_eq!(
            result.key_terms,
            vec!["indemnification", "indemnify", "hold harmless"]
        );
    }

    #[test]
    fn test_body_keywords_scale_confidence() {
        let one = classifier().classify(&clause("This Agreement shall remain confidential.", None));
        assert_eq!(one.category, ClauseCategory::Confidentiality);
        assert!((one.confidence - 0.45).abs() < 1e-6);

        let many = classifier().classify(&clause(
            "Recipient shall not disclose proprietary or confidential trade secrets.",
            None,
        ));
        assert_eq!(many.category, ClauseCategory::Confidentiality);
        assert!(many.confidence > one.confidence);
        assert!(many.confidence <= BODY_MAX_CONFIDENCE);
    }

    #[test]
    fn test_no_match_is_other() {
        let result = classifier().classify(&clause("The recitals form part of this document.", None));
        assert_eq!(result, Classification::other());
    }

    #[test]
    fn test_ties_break_by_category_order() {
        // One keyword each for confidentiality and payment
        let result = classifier().classify(&clause("Fees are confidential.", None));
        assert_eq!(result.category, ClauseCategory::Confidentiality);
    }

    #[test]
    fn test_needs_refinement_uses_threshold() {
        let classifier = ClauseClassifier::new(classifier(), RefinementPolicy::default());
        let mut c = Classification::other();
        assert!(classifier.needs_refinement(&c));

        c.category = ClauseCategory::Payment;
        c.confidence = 0.45;
        assert!(classifier.needs_refinement(&c));

        c.confidence = 0.5;
        assert!(!classifier.needs_refinement(&c));
    }
}
