//! Full analysis runs over text, PDF uploads and fake refinement services

use std::sync::Arc;
use std::time::Duration;

use analysis_pipeline::{
    AnalysisError, AnalysisPipeline, AnalyzerConfig, Upload, NOT_LEGAL_WARNING,
};
use async_trait::async_trait;
use clause_engine::{RefinedLabel, RefinementService, ServiceError};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use shared_types::{
    AnalysisReport, ClassificationSource, Clause, ClauseCategory, DocumentFormat,
    DocumentRiskProfile, RequestContext, RiskLevel,
};

const AGREEMENT: &str = "This Agreement shall remain confidential. Either party may terminate with 30 days notice. Governing law: State of Delaware.";
const INDEMNITY: &str =
    "Indemnification: Client shall indemnify and hold harmless Vendor for unlimited liability.";

struct UnreachableService;

#[async_trait]
impl RefinementService for UnreachableService {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn classify(&self, _clause_text: &str) -> Result<RefinedLabel, ServiceError> {
        Err(ServiceError::Unavailable("connection refused".to_string()))
    }

    async fn summarize(&self, _clause_text: &str) -> Result<String, ServiceError> {
        Err(ServiceError::Unavailable("connection refused".to_string()))
    }
}

struct HangingService;

#[async_trait]
impl RefinementService for HangingService {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn classify(&self, _clause_text: &str) -> Result<RefinedLabel, ServiceError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ServiceError::Unavailable("too late".to_string()))
    }

    async fn summarize(&self, _clause_text: &str) -> Result<String, ServiceError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ServiceError::Unavailable("too late".to_string()))
    }
}

/// Labels every clause as payment and summarizes it
struct PaymentService;

#[async_trait]
impl RefinementService for PaymentService {
    fn name(&self) -> &str {
        "payment"
    }

    async fn classify(&self, _clause_text: &str) -> Result<RefinedLabel, ServiceError> {
        Ok(RefinedLabel {
            category: ClauseCategory::Payment,
            confidence: 0.9,
            key_terms: vec!["fee".to_string()],
        })
    }

    async fn summarize(&self, _clause_text: &str) -> Result<String, ServiceError> {
        Ok("Short summary.".to_string())
    }
}

fn pipeline() -> AnalysisPipeline {
    AnalysisPipeline::from_config_with_api_key(&AnalyzerConfig::default(), None).unwrap()
}

fn fast_pipeline() -> AnalysisPipeline {
    let config = AnalyzerConfig::from_str("[refinement]\ntimeout_ms = 50").unwrap();
    AnalysisPipeline::from_config_with_api_key(&config, None).unwrap()
}

/// Clause-level outcome without the per-run id and timestamp
fn outcome(report: &AnalysisReport) -> (Vec<Clause>, DocumentRiskProfile, Vec<String>) {
    (report.clauses.clone(), report.profile.clone(), report.warnings.clone())
}

fn create_test_pdf(text: &str) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

#[tokio::test]
async fn test_agreement_example() {
    let report = pipeline()
        .analyze_text(&RequestContext::anonymous(), AGREEMENT, false)
        .await
        .unwrap();

    let categories: Vec<ClauseCategory> = report.clauses.iter().map(|c| c.category).collect();
    assert_eq!(
        categories,
        vec![
            ClauseCategory::Confidentiality,
            ClauseCategory::Termination,
            ClauseCategory::GoverningLaw,
        ]
    );
    assert!(report.clauses.iter().all(|c| c.risk != RiskLevel::High));
    assert_eq!(
        report.profile.missing_categories(),
        vec![ClauseCategory::DisputeResolution]
    );
    assert_eq!(report.format, DocumentFormat::PlainText);
    assert!(!report.refinement_active);
    assert!(report.filename.is_none());
}

#[tokio::test]
async fn test_indemnity_example() {
    let report = pipeline()
        .analyze_text(&RequestContext::new("alice"), INDEMNITY, false)
        .await
        .unwrap();

    assert_eq!(report.clauses.len(), 1);
    assert_eq!(report.clauses[0].category, ClauseCategory::Indemnification);
    assert_eq!(report.clauses[0].risk, RiskLevel::High);
    assert_eq!(report.clauses[0].flagged_terms, vec!["unlimited liability"]);
    assert_eq!(report.profile.aggregate, RiskLevel::High);
    assert_eq!(report.profile.missing_essential.len(), 4);
}

#[tokio::test]
async fn test_pdf_upload() {
    let bytes = create_test_pdf(AGREEMENT);
    let report = pipeline()
        .analyze(
            &RequestContext::anonymous(),
            Upload::new("agreement.pdf", bytes),
            false,
        )
        .await
        .unwrap();

    assert_eq!(report.format, DocumentFormat::Pdf);
    assert_eq!(report.pages, 1);
    assert_eq!(report.filename.as_deref(), Some("agreement.pdf"));
    assert!(report
        .clauses
        .iter()
        .any(|c| c.category == ClauseCategory::GoverningLaw));
}

#[tokio::test]
async fn test_loader_errors_abort_the_run() {
    let pipeline = pipeline();
    let ctx = RequestContext::anonymous();

    let err = pipeline
        .analyze(&ctx, Upload::new("contract.odt", b"text".to_vec()), false)
        .await
        .unwrap_err();
    assert_eq!(err, AnalysisError::UnsupportedFormat(".odt".to_string()));
    assert_eq!(err.code(), "UNSUPPORTED_FORMAT");

    let err = pipeline
        .analyze(&ctx, Upload::new("contract.pdf", b"%PDF-1.7 truncated".to_vec()), false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::CorruptDocument {
            format: Some(DocumentFormat::Pdf),
            ..
        }
    ));

    let err = pipeline.analyze_text(&ctx, "", false).await.unwrap_err();
    assert!(matches!(err, AnalysisError::CorruptDocument { .. }));
}

#[tokio::test]
async fn test_pasted_text_is_never_sniffed() {
    let pasted = format!("%PDF-1.7 appears in the quoted exhibit. {}", AGREEMENT);
    let report = pipeline()
        .analyze_text(&RequestContext::anonymous(), &pasted, false)
        .await
        .unwrap();

    assert_eq!(report.format, DocumentFormat::PlainText);
    assert_eq!(report.filename, None);
    assert!(report
        .clauses
        .iter()
        .any(|c| c.category == ClauseCategory::GoverningLaw));
}

#[tokio::test]
async fn test_oversized_text_rejected() {
    let config = AnalyzerConfig::from_str("[loader]\nmax_upload_bytes = 64").unwrap();
    let pipeline = AnalysisPipeline::from_config_with_api_key(&config, None).unwrap();
    let err = pipeline
        .analyze_text(&RequestContext::anonymous(), AGREEMENT, false)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AnalysisError::TooLarge {
            size: AGREEMENT.len(),
            limit: 64
        }
    );
}

#[tokio::test]
async fn test_unreachable_service_matches_disabled() {
    let ctx = RequestContext::anonymous();
    let expected = fast_pipeline().analyze_text(&ctx, AGREEMENT, true).await.unwrap();

    for service in [
        Arc::new(UnreachableService) as Arc<dyn RefinementService>,
        Arc::new(HangingService),
    ] {
        let pipeline = fast_pipeline().with_refinement_service(service);
        let report = pipeline.analyze_text(&ctx, AGREEMENT, true).await.unwrap();
        assert!(report.refinement_active);
        assert_eq!(outcome(&report), outcome(&expected));
    }
}

#[tokio::test]
async fn test_refinement_and_summaries_flow_into_report() {
    let pipeline = pipeline().with_refinement_service(Arc::new(PaymentService));
    let report = pipeline
        .analyze_text(&RequestContext::anonymous(), AGREEMENT, true)
        .await
        .unwrap();

    // Weak body-keyword labels are refined; the heading match stays
    assert_eq!(report.clauses[0].category, ClauseCategory::Payment);
    assert_eq!(report.clauses[0].classified_by, ClassificationSource::Refined);
    assert_eq!(report.clauses[2].category, ClauseCategory::GoverningLaw);
    assert!(report
        .clauses
        .iter()
        .all(|c| c.summary.as_deref() == Some("Short summary.")));
    assert!(report.profile.is_missing(ClauseCategory::Confidentiality));
}

#[tokio::test]
async fn test_short_non_contract_text_gets_warning() {
    let report = pipeline()
        .analyze_text(&RequestContext::anonymous(), "Buy milk. Call the plumber.", false)
        .await
        .unwrap();
    assert_eq!(report.warnings, vec![NOT_LEGAL_WARNING.to_string()]);
    assert_eq!(report.clauses.len(), 2);
}

#[tokio::test]
async fn test_each_run_gets_a_fresh_document_id() {
    let pipeline = pipeline();
    let ctx = RequestContext::anonymous();
    let first = pipeline.analyze_text(&ctx, AGREEMENT, false).await.unwrap();
    let second = pipeline.analyze_text(&ctx, AGREEMENT, false).await.unwrap();

    assert_ne!(first.document_id, second.document_id);
    assert_eq!(outcome(&first), outcome(&second));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_every_clause_reaches_the_profile(text in "[A-Za-z ,.]{1,400}") {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(
            pipeline().analyze_text(&RequestContext::anonymous(), &text, false),
        );

        match result {
            Ok(report) => {
                prop_assert_eq!(report.clauses.len(), report.profile.clause_risks.len());
                for (i, clause) in report.clauses.iter().enumerate() {
                    prop_assert_eq!(clause.index, i);
                    prop_assert_eq!(report.profile.clause_risks[i].index, i);
                    prop_assert_eq!(report.profile.clause_risks[i].level, clause.risk);
                }
            }
            // Whitespace-only input has no text to analyze
            Err(err) => prop_assert!(text.trim().is_empty(), "unexpected error {:?}", err),
        }
    }
}
