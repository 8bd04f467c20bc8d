//! Recommendation lines for a scored document

use shared_types::{ClauseCategory, MissingClause};

use crate::rules::CategoryAdvice;

/// Upper bound on recommendation lines per document
pub const MAX_RECOMMENDATIONS: usize = 10;

/// Inputs the recommendation pass reads from a finished profile
pub(crate) struct RecommendationInput<'a> {
    pub missing: &'a [MissingClause],
    pub present: &'a [ClauseCategory],
    pub high_risk_clauses: usize,
    pub overall_risk_score: f32,
    pub completeness_score: f32,
    pub advice: &'a [CategoryAdvice],
}

/// Build the ordered, de-duplicated recommendation list.
///
/// Order: missing essential clauses, high-risk review, score band,
/// completeness, then per-category advice for absent categories.
pub(crate) fn recommend(input: &RecommendationInput<'_>) -> Vec<String> {
    let mut lines = Vec::new();

    for missing in input.missing {
        let line = if missing.note.is_empty() {
            format!(
                "IMPORTANT: Consider adding a {} clause",
                missing.category.title()
            )
        } else {
            format!(
                "IMPORTANT: Consider adding a {} clause: it {}",
                missing.category.title(),
                missing.note
            )
        };
        lines.push(line);
    }

    if input.high_risk_clauses > 0 {
        lines.push(format!(
            "CAUTION: {} high-risk clause{} found - review with legal counsel",
            input.high_risk_clauses,
            if input.high_risk_clauses == 1 { "" } else { "s" }
        ));
    }

    lines.push(score_band(input.overall_risk_score).to_string());

    if input.completeness_score < 60.0 {
        lines.push(
            "INCOMPLETE: Contract is missing several standard protections".to_string(),
        );
    } else if input.completeness_score < 80.0 {
        lines.push("REVIEW: Contract could benefit from additional standard clauses".to_string());
    }

    for advice in input.advice {
        if !input.present.contains(&advice.category) && !advice.text.is_empty() {
            lines.push(advice.text.clone());
        }
    }

    dedup_in_order(&mut lines);
    lines.truncate(MAX_RECOMMENDATIONS);
    lines
}

fn score_band(score: f32) -> &'static str {
    if score > 70.0 {
        "HIGH RISK: Consider significant revisions before signing"
    } else if score > 40.0 {
        "MEDIUM RISK: Review and negotiate key terms"
    } else {
        "LOW RISK: Contract appears relatively balanced"
    }
}

fn dedup_in_order(lines: &mut Vec<String>) {
    let mut seen: Vec<String> = Vec::with_capacity(lines.len());
    lines.retain(|line| {
        if seen.contains(line) {
            false
        } else {
            seen.push(line.clone());
            true
        }
    });
}
