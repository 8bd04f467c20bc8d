//! Domain types shared by every stage of the contract analysis pipeline.
//!
//! Data flows strictly forward: a loaded [`Document`] is segmented into
//! [`Clause`]s, each clause is classified and risk-labelled in place, and the
//! scorer derives one [`DocumentRiskProfile`]. The pair is wrapped in an
//! [`AnalysisReport`], which is the only contract downstream renderers see.

pub mod context;
pub mod report;
pub mod risk;
pub mod terms;
pub mod types;

pub use context::RequestContext;
pub use report::{AnalysisReport, AnalysisSummary};
pub use terms::{compile_terms, TermError, TermPattern};
pub use risk::{ClauseRisk, DetectedTerm, DocumentRiskProfile, MissingClause, RiskCounts, RiskLevel};
pub use types::{
    Classification, ClassificationSource, Clause, ClauseCategory, Document, DocumentFormat,
    ParseCategoryError, TextSpan, PAGE_BREAK,
};
