//! Whole-word, case-insensitive phrase matching for configured vocabularies
//!
//! Rule tables (clause-header vocabulary, high-risk terms, hedging terms) are
//! plain phrases. A [`TermPattern`] matches its phrase on word boundaries
//! regardless of case, and tolerates any run of whitespace (including line
//! breaks) between the phrase's words.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    #[error("term is empty")]
    Empty,

    #[error("invalid pattern for term '{term}': {reason}")]
    Invalid { term: String, reason: String },
}

/// A configured keyword or phrase, compiled once
#[derive(Debug, Clone)]
pub struct TermPattern {
    term: String,
    regex: Regex,
}

impl TermPattern {
    pub fn new(term: &str) -> Result<Self, TermError> {
        let words: Vec<String> = term.split_whitespace().map(regex::escape).collect();
        if words.is_empty() {
            return Err(TermError::Empty);
        }

        let trimmed = term.trim();
        let lead = if trimmed.starts_with(is_word_char) { r"\b" } else { "" };
        let tail = if trimmed.ends_with(is_word_char) { r"\b" } else { "" };
        let source = format!(r"(?i){}{}{}", lead, words.join(r"\s+"), tail);

        let regex = Regex::new(&source).map_err(|e| TermError::Invalid {
            term: term.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            term: words_joined(term),
            regex,
        })
    }

    /// The phrase as configured, whitespace-normalized
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Byte range of the first occurrence
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.regex.find(text).map(|m| (m.start(), m.end()))
    }
}

/// Compile a list of phrases, failing on the first bad one
pub fn compile_terms<S: AsRef<str>>(terms: &[S]) -> Result<Vec<TermPattern>, TermError> {
    terms.iter().map(|t| TermPattern::new(t.as_ref())).collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn words_joined(term: &str) -> String {
    term.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_whole_words_any_case() {
        let term = TermPattern::new("unlimited liability").unwrap();
        assert!(term.is_match("Vendor accepts UNLIMITED LIABILITY for all claims"));
        assert!(term.is_match("unlimited\nliability"));
        assert!(!term.is_match("unlimited liabilityinsurance"));
        assert!(!term.is_match("limited liability"));
    }

    #[test]
    fn test_short_words_do_not_match_inside_others() {
        let may = TermPattern::new("may").unwrap();
        assert!(may.is_match("Either party may terminate."));
        assert!(!may.is_match("This is a dismayed party."));
    }

    #[test]
    fn test_hyphenated_terms() {
        let term = TermPattern::new("non-compete").unwrap();
        assert!(term.is_match("a two-year Non-Compete covenant"));
        assert_eq!(term.find("the non-compete"), Some((4, 15)));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let term = TermPattern::new("as is (where is)").unwrap();
        assert!(term.is_match("sold as is (where is) basis"));
        assert!(!term.is_match("sold as is where is basis"));
    }

    #[test]
    fn test_term_is_whitespace_normalized() {
        let term = TermPattern::new("  sole   discretion ").unwrap();
        assert_eq!(term.term(), "sole discretion");
    }

    #[test]
    fn test_empty_term_rejected() {
        assert_eq!(TermPattern::new("   ").unwrap_err(), TermError::Empty);
        assert!(compile_terms(&["ok", ""]).is_err());
    }
}
