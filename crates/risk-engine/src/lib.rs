//! Risk scoring for classified contract clauses
//!
//! Each clause is labelled from a rule table: any high-risk term makes it
//! `high`, a hedging qualifier without a high-risk term makes it `medium`,
//! anything else is `low`. The document profile adds the essential categories
//! that no clause covers, overall and completeness scores, and
//! recommendations. Scoring is pure and never fails.
//!
//! # Example
//!
//! ```
//! use risk_engine::{RiskRules, RiskScorer};
//! use shared_types::{Clause, ClauseCategory, RiskLevel, TextSpan};
//!
//! let text = "Client shall indemnify Vendor for unlimited liability.";
//! let mut clause = Clause::new(0, text, TextSpan { start: 0, end: text.len() });
//! clause.category = ClauseCategory::Indemnification;
//!
//! let scorer = RiskScorer::new(RiskRules::builtin().unwrap());
//! let mut clauses = vec![clause];
//! let profile = scorer.assess(&mut clauses);
//!
//! assert_eq!(clauses[0].risk, RiskLevel::High);
//! assert_eq!(profile.aggregate, RiskLevel::High);
//! assert_eq!(profile.missing_essential.len(), 4);
//! ```

pub mod recommendations;
pub mod rules;
pub mod scorer;

pub use recommendations::MAX_RECOMMENDATIONS;
pub use rules::{CategoryAdvice, EssentialCategory, RiskRules, RuleError};
pub use scorer::{RiskScorer, MISSING_CLAUSE_SEVERITY};
