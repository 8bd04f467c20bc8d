//! Per-clause labels and the document risk profile

use shared_types::{
    Clause, ClauseCategory, ClauseRisk, DetectedTerm, DocumentRiskProfile, MissingClause,
    RiskCounts, RiskLevel, TermPattern,
};
use tracing::debug;

use crate::recommendations::{recommend, RecommendationInput};
use crate::rules::RiskRules;

/// Severity recorded for an absent essential category
pub const MISSING_CLAUSE_SEVERITY: RiskLevel = RiskLevel::Medium;

/// Rule-table risk scorer.
///
/// Pure: the same rules and clauses always give the same profile.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    rules: RiskRules,
}

impl RiskScorer {
    pub fn new(rules: RiskRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RiskRules {
        &self.rules
    }

    /// Label one clause from its text
    pub fn score_clause(&self, clause: &Clause) -> ClauseRisk {
        let high_risk_terms = matched(&self.rules.high_risk_terms, &clause.text);
        let hedging_terms = matched(&self.rules.hedging_terms, &clause.text);

        let level = if !high_risk_terms.is_empty() {
            RiskLevel::High
        } else if !hedging_terms.is_empty() {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        ClauseRisk {
            index: clause.index,
            category: clause.category,
            level,
            high_risk_terms,
            hedging_terms,
        }
    }

    /// Score every clause in place and build the document profile.
    ///
    /// Clauses keep their order and count; each gets its `risk` label and
    /// `flagged_terms`.
    pub fn assess(&self, clauses: &mut [Clause]) -> DocumentRiskProfile {
        let mut counts = RiskCounts::default();
        let mut clause_risks = Vec::with_capacity(clauses.len());
        let mut high_risk_terms = Vec::new();
        let mut hedging_terms = Vec::new();
        let mut weight_sum = 0u32;
        let mut highest = RiskLevel::None;

        for clause in clauses.iter_mut() {
            let risk = self.score_clause(clause);

            clause.risk = risk.level;
            clause.flagged_terms = risk
                .high_risk_terms
                .iter()
                .chain(&risk.hedging_terms)
                .cloned()
                .collect();

            counts.record(risk.level);
            weight_sum += risk.level.weight();
            highest = highest.max(risk.level);

            high_risk_terms.extend(risk.high_risk_terms.iter().map(|term| DetectedTerm {
                term: term.clone(),
                clause_index: clause.index,
            }));
            hedging_terms.extend(risk.hedging_terms.iter().map(|term| DetectedTerm {
                term: term.clone(),
                clause_index: clause.index,
            }));

            if risk.level == RiskLevel::High {
                debug!(
                    clause_index = clause.index,
                    terms = ?risk.high_risk_terms,
                    "High-risk clause"
                );
            }
            clause_risks.push(risk);
        }

        let present: Vec<ClauseCategory> = present_categories(clauses);
        let missing_essential: Vec<MissingClause> = self
            .rules
            .essential
            .iter()
            .filter(|essential| !present.contains(&essential.category))
            .map(|essential| MissingClause {
                category: essential.category,
                severity: MISSING_CLAUSE_SEVERITY,
                note: essential.note.clone(),
            })
            .collect();

        let aggregate = if missing_essential.is_empty() {
            highest
        } else {
            highest.max(MISSING_CLAUSE_SEVERITY)
        };

        let overall_risk_score = if clauses.is_empty() {
            0.0
        } else {
            weight_sum as f32 / (3 * clauses.len()) as f32 * 100.0
        };
        let essential_total = self.rules.essential.len();
        let completeness_score = if essential_total == 0 {
            100.0
        } else {
            (essential_total - missing_essential.len()) as f32 / essential_total as f32 * 100.0
        };

        let recommendations = recommend(&RecommendationInput {
            missing: &missing_essential,
            present: &present,
            high_risk_clauses: counts.high,
            overall_risk_score,
            completeness_score,
            advice: &self.rules.advice,
        });

        DocumentRiskProfile {
            aggregate,
            counts,
            clause_risks,
            high_risk_terms,
            hedging_terms,
            missing_essential,
            overall_risk_score,
            completeness_score,
            recommendations,
        }
    }
}

fn matched(patterns: &[TermPattern], text: &str) -> Vec<String> {
    patterns
        .iter()
        .filter(|pattern| pattern.is_match(text))
        .map(|pattern| pattern.term().to_string())
        .collect()
}

fn present_categories(clauses: &[Clause]) -> Vec<ClauseCategory> {
    let mut present: Vec<ClauseCategory> = clauses.iter().map(|c| c.category).collect();
    present.sort();
    present.dedup();
    present
}
