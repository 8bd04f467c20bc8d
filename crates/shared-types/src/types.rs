use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page/section separator marker (form feed). In normalized text it always
/// sits on a line of its own.
pub const PAGE_BREAK: char = '\u{000C}';

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Map a file extension (without the dot, any case) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "txt" | "text" | "md" => Some(DocumentFormat::PlainText),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::PlainText => "plain_text",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded document: raw bytes, detected format and normalized text.
///
/// Immutable once constructed. The raw bytes never leave the pipeline
/// invocation that loaded them and are not serialized.
#[derive(Debug, Clone)]
pub struct Document {
    raw: Vec<u8>,
    format: DocumentFormat,
    text: String,
    pages: u32,
}

impl Document {
    pub fn new(raw: Vec<u8>, format: DocumentFormat, text: String, pages: u32) -> Self {
        Self {
            raw,
            format,
            text,
            pages,
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Normalized plain text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }
}

/// Closed set of clause categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClauseCategory {
    Confidentiality,
    Liability,
    Termination,
    Indemnification,
    Payment,
    GoverningLaw,
    DisputeResolution,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown clause category: {0}")]
pub struct ParseCategoryError(pub String);

impl ClauseCategory {
    pub const ALL: [ClauseCategory; 8] = [
        ClauseCategory::Confidentiality,
        ClauseCategory::Liability,
        ClauseCategory::Termination,
        ClauseCategory::Indemnification,
        ClauseCategory::Payment,
        ClauseCategory::GoverningLaw,
        ClauseCategory::DisputeResolution,
        ClauseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseCategory::Confidentiality => "confidentiality",
            ClauseCategory::Liability => "liability",
            ClauseCategory::Termination => "termination",
            ClauseCategory::Indemnification => "indemnification",
            ClauseCategory::Payment => "payment",
            ClauseCategory::GoverningLaw => "governing-law",
            ClauseCategory::DisputeResolution => "dispute-resolution",
            ClauseCategory::Other => "other",
        }
    }

    /// Human-readable title, e.g. "Governing Law"
    pub fn title(&self) -> &'static str {
        match self {
            ClauseCategory::Confidentiality => "Confidentiality",
            ClauseCategory::Liability => "Liability",
            ClauseCategory::Termination => "Termination",
            ClauseCategory::Indemnification => "Indemnification",
            ClauseCategory::Payment => "Payment",
            ClauseCategory::GoverningLaw => "Governing Law",
            ClauseCategory::DisputeResolution => "Dispute Resolution",
            ClauseCategory::Other => "Other",
        }
    }

    /// Lenient mapping of free-form labels (as returned by external
    /// classification services) onto the closed set.
    ///
    /// Accepts any case and any of space, `_` or `-` as a separator, plus a
    /// few common synonyms. Returns `None` for labels outside the set.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '_' | ' ' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        let category = match normalized.as_str() {
            "confidentiality" | "confidential" | "non-disclosure" | "nda" => {
                ClauseCategory::Confidentiality
            }
            "liability" | "limitation-of-liability" => ClauseCategory::Liability,
            "termination" => ClauseCategory::Termination,
            "indemnification" | "indemnity" => ClauseCategory::Indemnification,
            "payment" | "payment-terms" | "fees" => ClauseCategory::Payment,
            "governing-law" | "choice-of-law" | "jurisdiction" => ClauseCategory::GoverningLaw,
            "dispute-resolution" | "arbitration" | "disputes" => {
                ClauseCategory::DisputeResolution
            }
            "other" | "general" | "uncategorized" => ClauseCategory::Other,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for ClauseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClauseCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClauseCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Which pass produced a clause's category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    #[default]
    Deterministic,
    Refined,
}

/// Result of classifying one clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: ClauseCategory,
    /// 0.0 (no evidence) to 1.0 (certain)
    pub confidence: f32,
    pub source: ClassificationSource,
    /// Vocabulary terms that supported the label
    pub key_terms: Vec<String>,
}

impl Classification {
    /// The "no match" outcome of the deterministic pass
    pub fn other() -> Self {
        Self {
            category: ClauseCategory::Other,
            confidence: 0.0,
            source: ClassificationSource::Deterministic,
            key_terms: Vec::new(),
        }
    }
}

/// Byte offsets into the normalized document text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

/// One clause of a document, identified by its document-order index.
///
/// Created by the segmenter, then enriched in place by the classifier
/// (category, confidence, summary) and the risk scorer (risk label).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub index: usize,
    pub text: String,
    pub span: TextSpan,
    /// Structural heading the clause started with, if any
    pub heading: Option<String>,
    pub category: ClauseCategory,
    pub confidence: f32,
    pub classified_by: ClassificationSource,
    pub key_terms: Vec<String>,
    pub summary: Option<String>,
    pub risk: crate::RiskLevel,
    /// High-risk and hedging terms found by the scorer
    pub flagged_terms: Vec<String>,
}

impl Clause {
    pub fn new(index: usize, text: impl Into<String>, span: TextSpan) -> Self {
        Self {
            index,
            text: text.into(),
            span,
            heading: None,
            category: ClauseCategory::Other,
            confidence: 0.0,
            classified_by: ClassificationSource::Deterministic,
            key_terms: Vec::new(),
            summary: None,
            risk: crate::RiskLevel::None,
            flagged_terms: Vec::new(),
        }
    }

    pub fn with_heading(mut self, heading: Option<String>) -> Self {
        self.heading = heading;
        self
    }

    pub fn apply_classification(&mut self, classification: Classification) {
        self.category = classification.category;
        self.confidence = classification.confidence;
        self.classified_by = classification.source;
        self.key_terms = classification.key_terms;
    }

    /// First `max_chars` characters, with an ellipsis when truncated
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            self.text.clone()
        } else {
            let head: String = self.text.chars().take(max_chars).collect();
            format!("{}...", head.trim_end())
        }
    }
}
