use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Clause, DocumentFormat, DocumentRiskProfile, RiskLevel};

/// Output of one analysis run: the ordered clause list plus the document
/// risk profile. This is the only shape downstream renderers consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Opaque document identifier (UUID v4)
    pub document_id: String,
    pub filename: Option<String>,
    pub format: DocumentFormat,
    pub pages: u32,
    pub analyzed_at: DateTime<Utc>,
    pub clauses: Vec<Clause>,
    pub profile: DocumentRiskProfile,
    /// Non-fatal observations (e.g. text does not look like a contract)
    pub warnings: Vec<String>,
    /// Whether the external refinement service was configured for this run
    pub refinement_active: bool,
}

impl AnalysisReport {
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            document_id: self.document_id.clone(),
            filename: self.filename.clone(),
            format: self.format,
            analyzed_at: self.analyzed_at,
            clause_count: self.clauses.len(),
            aggregate: self.profile.aggregate,
            overall_risk_score: self.profile.overall_risk_score,
        }
    }
}

/// History listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub document_id: String,
    pub filename: Option<String>,
    pub format: DocumentFormat,
    pub analyzed_at: DateTime<Utc>,
    pub clause_count: usize,
    pub aggregate: RiskLevel,
    pub overall_risk_score: f32,
}
