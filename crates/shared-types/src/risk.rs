use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ClauseCategory;

/// Risk label, ordered from `None` (unscored) to `High`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Weight used by the overall risk score
    pub fn weight(&self) -> u32 {
        match self {
            RiskLevel::None => 0,
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of clauses per risk label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    pub none: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskCounts {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::None => self.none += 1,
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.none + self.low + self.medium + self.high
    }
}

/// A configured term found in a clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedTerm {
    pub term: String,
    pub clause_index: usize,
}

/// An essential category with zero matching clauses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingClause {
    pub category: ClauseCategory,
    pub severity: RiskLevel,
    pub note: String,
}

/// Risk outcome for a single clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseRisk {
    pub index: usize,
    pub category: ClauseCategory,
    pub level: RiskLevel,
    pub high_risk_terms: Vec<String>,
    pub hedging_terms: Vec<String>,
}

/// Aggregate risk over every clause of one document.
///
/// Derived data: recomputed on each analysis run from the clause list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRiskProfile {
    /// max(missing-clause severity, highest clause label)
    pub aggregate: RiskLevel,
    pub counts: RiskCounts,
    /// One entry per clause, in document order
    pub clause_risks: Vec<ClauseRisk>,
    pub high_risk_terms: Vec<DetectedTerm>,
    pub hedging_terms: Vec<DetectedTerm>,
    pub missing_essential: Vec<MissingClause>,
    /// 0-100, weighted by clause labels
    pub overall_risk_score: f32,
    /// 0-100, share of essential categories present
    pub completeness_score: f32,
    pub recommendations: Vec<String>,
}

impl DocumentRiskProfile {
    pub fn is_missing(&self, category: ClauseCategory) -> bool {
        self.missing_essential
            .iter()
            .any(|missing| missing.category == category)
    }

    pub fn missing_categories(&self) -> Vec<ClauseCategory> {
        self.missing_essential.iter().map(|m| m.category).collect()
    }
}
