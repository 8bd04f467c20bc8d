//! Heuristic check that extracted text reads like a contract

use lazy_static::lazy_static;
use regex::Regex;

/// Terms that commonly appear in legal agreements
pub const LEGAL_INDICATORS: &[&str] = &[
    "agreement",
    "contract",
    "party",
    "parties",
    "terms",
    "conditions",
    "liability",
    "indemnity",
    "confidential",
    "termination",
    "clause",
    "section",
    "whereas",
    "therefore",
    "herein",
    "hereby",
];

/// Minimum number of distinct indicators for text to count as legal
pub const MIN_LEGAL_INDICATORS: usize = 3;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[A-Za-z]+").unwrap();
}

/// Returns true when `text` has at least `min_chars` characters and contains
/// at least [`MIN_LEGAL_INDICATORS`] distinct legal indicator words.
pub fn looks_like_legal_document(text: &str, min_chars: usize) -> bool {
    if text.trim().chars().count() < min_chars {
        return false;
    }
    count_legal_indicators(text) >= MIN_LEGAL_INDICATORS
}

/// Number of distinct [`LEGAL_INDICATORS`] present as whole words
pub fn count_legal_indicators(text: &str) -> usize {
    let mut seen = [false; LEGAL_INDICATORS.len()];
    for word in WORD.find_iter(text) {
        let word = word.as_str().to_ascii_lowercase();
        if let Some(pos) = LEGAL_INDICATORS.iter().position(|&t| t == word) {
            seen[pos] = true;
        }
    }
    seen.iter().filter(|&&s| s).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_text_passes() {
        let text = "This Agreement is entered into by and between the Parties. \
                    WHEREAS the parties wish to set out the terms and conditions herein, \
                    each party hereby agrees to the following.";
        assert!(looks_like_legal_document(text, 100));
    }

    #[test]
    fn test_short_text_fails() {
        assert!(!looks_like_legal_document("Agreement between parties on terms.", 100));
    }

    #[test]
    fn test_non_legal_text_fails() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(5);
        assert!(!looks_like_legal_document(&text, 100));
    }

    #[test]
    fn test_indicators_counted_once() {
        assert_eq!(count_legal_indicators("party party PARTY Party"), 1);
    }
}
