//! Classifier behaviour with in-process refinement services

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clause_engine::{
    ClauseClassifier, DeterministicClassifier, RefinedLabel, RefinementPolicy, RefinementService,
    Segmenter, ServiceError, Vocabulary,
};
use pretty_assertions::assert_eq;
use shared_types::{ClassificationSource, Clause, ClauseCategory};

const EXAMPLE: &str = "This Agreement shall remain confidential. Either party may terminate with 30 days notice. Governing law: State of Delaware.";

/// Answers every request with a fixed label and summary
struct FixedService {
    label: RefinedLabel,
    calls: AtomicUsize,
}

#[async_trait]
impl RefinementService for FixedService {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn classify(&self, _clause_text: &str) -> Result<RefinedLabel, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.label.clone())
    }

    async fn summarize(&self, clause_text: &str) -> Result<String, ServiceError> {
        Ok(format!("Plain: {}", clause_text))
    }
}

/// Fails every request the same way
struct FailingService(ServiceError);

#[async_trait]
impl RefinementService for FailingService {
    fn name(&self) -> &str {
        "failing"
    }

    async fn classify(&self, _clause_text: &str) -> Result<RefinedLabel, ServiceError> {
        Err(self.0.clone())
    }

    async fn summarize(&self, _clause_text: &str) -> Result<String, ServiceError> {
        Err(self.0.clone())
    }
}

/// Never answers within any reasonable timeout
struct SlowService;

#[async_trait]
impl RefinementService for SlowService {
    fn name(&self) -> &str {
        "slow"
    }

    async fn classify(&self, _clause_text: &str) -> Result<RefinedLabel, ServiceError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(RefinedLabel {
            category: ClauseCategory::Payment,
            confidence: 1.0,
            key_terms: vec![],
        })
    }

    async fn summarize(&self, _clause_text: &str) -> Result<String, ServiceError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("too late".to_string())
    }
}

/// Hangs on every request and counts how often it was asked
struct HangingService {
    calls: AtomicUsize,
}

#[async_trait]
impl RefinementService for HangingService {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn classify(&self, _clause_text: &str) -> Result<RefinedLabel, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn summarize(&self, _clause_text: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Records the length of the text it receives
struct RecordingService {
    seen_chars: AtomicUsize,
}

#[async_trait]
impl RefinementService for RecordingService {
    fn name(&self) -> &str {
        "recording"
    }

    async fn classify(&self, clause_text: &str) -> Result<RefinedLabel, ServiceError> {
        self.seen_chars
            .store(clause_text.chars().count(), Ordering::SeqCst);
        Err(ServiceError::Unavailable("recorded".to_string()))
    }

    async fn summarize(&self, _clause_text: &str) -> Result<String, ServiceError> {
        Err(ServiceError::Unavailable("recorded".to_string()))
    }
}

fn deterministic() -> DeterministicClassifier {
    DeterministicClassifier::new(Vocabulary::builtin().unwrap())
}

fn policy() -> RefinementPolicy {
    RefinementPolicy {
        timeout: Duration::from_millis(50),
        ..RefinementPolicy::default()
    }
}

fn segment(text: &str) -> Vec<Clause> {
    Segmenter::new().segment(text).collect()
}

async fn classify_all(classifier: &ClauseClassifier, text: &str, summarize: bool) -> Vec<Clause> {
    let mut clauses = segment(text);
    classifier.classify_all(&mut clauses, summarize).await;
    clauses
}

#[tokio::test]
async fn test_example_document_without_refinement() {
    let classifier = ClauseClassifier::new(deterministic(), policy());
    let clauses = classify_all(&classifier, EXAMPLE, false).await;

    let categories: Vec<ClauseCategory> = clauses.iter().map(|c| c.category).collect();
    assert_eq!(
        categories,
        vec![
            ClauseCategory::Confidentiality,
            ClauseCategory::Termination,
            ClauseCategory::GoverningLaw,
        ]
    );
    assert!(clauses
        .iter()
        .all(|c| c.classified_by == ClassificationSource::Deterministic && c.summary.is_none()));
}

#[tokio::test]
async fn test_deterministic_classification_is_stable() {
    let classifier = ClauseClassifier::new(deterministic(), policy());
    let first = classify_all(&classifier, EXAMPLE, false).await;
    let second = classify_all(&classifier, EXAMPLE, false).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unreachable_service_matches_disabled_output() {
    let disabled = ClauseClassifier::new(deterministic(), policy());
    let expected = classify_all(&disabled, EXAMPLE, true).await;

    let failures = [
        ServiceError::Unavailable("connection refused".to_string()),
        ServiceError::RateLimited,
        ServiceError::MalformedResponse("not json".to_string()),
        ServiceError::Timeout(50),
    ];
    for failure in failures {
        let classifier = ClauseClassifier::new(deterministic(), policy())
            .with_service(Arc::new(FailingService(failure.clone())));
        let actual = classify_all(&classifier, EXAMPLE, true).await;
        assert_eq!(actual, expected, "fallback differs for {:?}", failure);
    }
}

#[tokio::test]
async fn test_slow_service_times_out_to_deterministic() {
    let disabled = ClauseClassifier::new(deterministic(), policy());
    let expected = classify_all(&disabled, EXAMPLE, true).await;

    let classifier =
        ClauseClassifier::new(deterministic(), policy()).with_service(Arc::new(SlowService));
    let clause = &segment(EXAMPLE)[0];
    assert_eq!(classifier.refine(clause).await, Err(ServiceError::Timeout(50)));

    let actual = classify_all(&classifier, EXAMPLE, true).await;
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_refinement_only_for_weak_labels() {
    let service = Arc::new(FixedService {
        label: RefinedLabel {
            category: ClauseCategory::Liability,
            confidence: 0.95,
            key_terms: vec!["obligation".to_string()],
        },
        calls: AtomicUsize::new(0),
    });
    let classifier =
        ClauseClassifier::new(deterministic(), policy()).with_service(service.clone());
    let clauses = classify_all(&classifier, EXAMPLE, false).await;

    // The two body-keyword clauses are weak and get refined; the heading
    // match on "Governing law" is strong and is left alone.
    assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    assert_eq!(clauses[0].category, ClauseCategory::Liability);
    assert_eq!(clauses[0].classified_by, ClassificationSource::Refined);
    assert_eq!(clauses[0].key_terms, vec!["obligation"]);
    assert_eq!(clauses[2].category, ClauseCategory::GoverningLaw);
    assert_eq!(clauses[2].classified_by, ClassificationSource::Deterministic);
}

#[tokio::test]
async fn test_refined_other_keeps_deterministic_label() {
    let service = Arc::new(FixedService {
        label: RefinedLabel {
            category: ClauseCategory::Other,
            confidence: 0.9,
            key_terms: vec![],
        },
        calls: AtomicUsize::new(0),
    });
    let classifier = ClauseClassifier::new(deterministic(), policy()).with_service(service);
    let clauses = classify_all(&classifier, "This Agreement shall remain confidential.", false).await;
    assert_eq!(clauses[0].category, ClauseCategory::Confidentiality);
    assert_eq!(clauses[0].classified_by, ClassificationSource::Deterministic);
}

#[tokio::test]
async fn test_threshold_is_configurable() {
    let service = Arc::new(FixedService {
        label: RefinedLabel {
            category: ClauseCategory::Payment,
            confidence: 0.9,
            key_terms: vec![],
        },
        calls: AtomicUsize::new(0),
    });
    let strict = RefinementPolicy {
        confidence_threshold: 0.0,
        ..policy()
    };
    let classifier = ClauseClassifier::new(deterministic(), strict).with_service(service.clone());
    classify_all(&classifier, EXAMPLE, false).await;
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_out_of_range_confidence_is_malformed() {
    let service = Arc::new(FixedService {
        label: RefinedLabel {
            category: ClauseCategory::Payment,
            confidence: 3.0,
            key_terms: vec![],
        },
        calls: AtomicUsize::new(0),
    });
    let classifier = ClauseClassifier::new(deterministic(), policy()).with_service(service);
    let clauses = classify_all(&classifier, "This Agreement shall remain confidential.", false).await;
    assert_eq!(clauses[0].category, ClauseCategory::Confidentiality);
}

#[tokio::test]
async fn test_summaries_decorate_clauses() {
    let service = Arc::new(FixedService {
        label: RefinedLabel {
            category: ClauseCategory::Other,
            confidence: 0.5,
            key_terms: vec![],
        },
        calls: AtomicUsize::new(0),
    });
    let classifier = ClauseClassifier::new(deterministic(), policy()).with_service(service);

    let clauses = classify_all(&classifier, EXAMPLE, true).await;
    assert_eq!(
        clauses[2].summary.as_deref(),
        Some("Plain: Governing law: State of Delaware.")
    );

    let clauses = classify_all(&classifier, EXAMPLE, false).await;
    assert!(clauses.iter().all(|c| c.summary.is_none()));
}

#[tokio::test]
async fn test_long_clauses_are_truncated_before_sending() {
    let service = Arc::new(RecordingService {
        seen_chars: AtomicUsize::new(0),
    });
    let policy = RefinementPolicy {
        max_input_chars: 40,
        ..policy()
    };
    let classifier = ClauseClassifier::new(deterministic(), policy).with_service(service.clone());

    let long = format!("The recitals {} are binding.", "and more words ".repeat(20));
    classify_all(&classifier, &long, false).await;
    assert_eq!(service.seen_chars.load(Ordering::SeqCst), 40);
}

#[tokio::test]
async fn test_classification_preserves_order_and_count() {
    let text = "1. Fees. Client pays monthly.\n2. Confidentiality. Keep it secret.\n3. Misc. Notices go by mail.";
    let classifier = ClauseClassifier::new(deterministic(), policy())
        .with_service(Arc::new(FailingService(ServiceError::RateLimited)));
    let clauses = classify_all(&classifier, text, true).await;

    let indices: Vec<usize> = clauses.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(clauses[0].category, ClauseCategory::Payment);
    assert_eq!(clauses[1].category, ClauseCategory::Confidentiality);
    assert_eq!(clauses[2].category, ClauseCategory::Other);
}

#[tokio::test]
async fn test_dead_service_is_asked_once_per_document() {
    let text: String = (1..=40)
        .map(|n| format!("{}. The recitals form part of this document.\n", n))
        .collect();

    let disabled = ClauseClassifier::new(deterministic(), policy());
    let expected = classify_all(&disabled, &text, true).await;
    assert_eq!(expected.len(), 40);

    let service = Arc::new(HangingService {
        calls: AtomicUsize::new(0),
    });
    let classifier =
        ClauseClassifier::new(deterministic(), policy()).with_service(service.clone());
    let actual = classify_all(&classifier, &text, true).await;

    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_bad_answers_do_not_stop_refinement() {
    let service = Arc::new(FixedService {
        label: RefinedLabel {
            category: ClauseCategory::Payment,
            confidence: 3.0,
            key_terms: vec![],
        },
        calls: AtomicUsize::new(0),
    });
    let classifier =
        ClauseClassifier::new(deterministic(), policy()).with_service(service.clone());
    let clauses = classify_all(&classifier, EXAMPLE, false).await;

    // Both weak clauses are still sent after the first malformed label
    assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    assert_eq!(clauses[0].category, ClauseCategory::Confidentiality);
    assert_eq!(clauses[1].category, ClauseCategory::Termination);
}
