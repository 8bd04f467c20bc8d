//! Risk rule table
//!
//! The scorer's behaviour is entirely data: high-risk terms, hedging terms,
//! essential categories and per-category advice. The built-in table is
//! `rules/risk_rules.toml`; deployments can load their own.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use shared_types::{compile_terms, ClauseCategory, TermError, TermPattern};
use thiserror::Error;

const BUILTIN_RULES: &str = include_str!("../rules/risk_rules.toml");

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("failed to read risk rules {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid risk rules TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("risk rules define no high-risk terms")]
    NoHighRiskTerms,

    #[error("risk rules define no essential categories")]
    NoEssentialCategories,

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("category '{0}' cannot be essential")]
    ReservedCategory(ClauseCategory),

    #[error("essential category '{0}' listed twice")]
    DuplicateEssential(ClauseCategory),

    #[error("bad {list} term: {source}")]
    Term {
        list: &'static str,
        #[source]
        source: TermError,
    },
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    high_risk_terms: Vec<String>,
    #[serde(default)]
    hedging_terms: Vec<String>,
    #[serde(default)]
    essential: Vec<EssentialEntry>,
    #[serde(default)]
    advice: Vec<AdviceEntry>,
}

#[derive(Debug, Deserialize)]
struct EssentialEntry {
    category: String,
    #[serde(default)]
    note: String,
}

#[derive(Debug, Deserialize)]
struct AdviceEntry {
    category: String,
    text: String,
}

/// A category whose absence is a risk signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EssentialCategory {
    pub category: ClauseCategory,
    /// What the clause does, e.g. "specifies which jurisdiction's laws apply"
    pub note: String,
}

/// Advice given when no clause of `category` exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAdvice {
    pub category: ClauseCategory,
    pub text: String,
}

/// Compiled risk rule table
#[derive(Debug, Clone)]
pub struct RiskRules {
    pub high_risk_terms: Vec<TermPattern>,
    pub hedging_terms: Vec<TermPattern>,
    pub essential: Vec<EssentialCategory>,
    pub advice: Vec<CategoryAdvice>,
}

impl RiskRules {
    pub fn builtin() -> Result<Self, RuleError> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, RuleError> {
        let file: RulesFile = toml::from_str(s)?;

        if file.high_risk_terms.is_empty() {
            return Err(RuleError::NoHighRiskTerms);
        }
        if file.essential.is_empty() {
            return Err(RuleError::NoEssentialCategories);
        }

        let high_risk_terms = compile_terms(&file.high_risk_terms).map_err(|source| {
            RuleError::Term {
                list: "high-risk",
                source,
            }
        })?;
        let hedging_terms = compile_terms(&file.hedging_terms).map_err(|source| {
            RuleError::Term {
                list: "hedging",
                source,
            }
        })?;

        let mut essential: Vec<EssentialCategory> = Vec::with_capacity(file.essential.len());
        for entry in file.essential {
            let category = parse_category(&entry.category)?;
            if category == ClauseCategory::Other {
                return Err(RuleError::ReservedCategory(category));
            }
            if essential.iter().any(|e| e.category == category) {
                return Err(RuleError::DuplicateEssential(category));
            }
            essential.push(EssentialCategory {
                category,
                note: entry.note.trim().to_string(),
            });
        }

        let advice = file
            .advice
            .into_iter()
            .map(|entry| {
                Ok(CategoryAdvice {
                    category: parse_category(&entry.category)?,
                    text: entry.text.trim().to_string(),
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        Ok(Self {
            high_risk_terms,
            hedging_terms,
            essential,
            advice,
        })
    }

    pub fn is_essential(&self, category: ClauseCategory) -> bool {
        self.essential.iter().any(|e| e.category == category)
    }
}

fn parse_category(name: &str) -> Result<ClauseCategory, RuleError> {
    name.parse()
        .map_err(|_| RuleError::UnknownCategory(name.to_string()))
}
