//! Clause-header vocabulary, loaded from TOML
//!
//! The built-in table lives in `rules/vocabulary.toml` and is compiled into
//! the crate; deployments may replace it with their own file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use shared_types::{compile_terms, ClauseCategory, TermError, TermPattern};
use thiserror::Error;

const BUILTIN_VOCABULARY: &str = include_str!("../rules/vocabulary.toml");

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to read vocabulary file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid vocabulary TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("vocabulary defines no categories")]
    NoCategories,

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("category '{0}' cannot carry vocabulary")]
    ReservedCategory(ClauseCategory),

    #[error("category '{0}' is defined more than once")]
    DuplicateCategory(ClauseCategory),

    #[error("category '{0}' has neither headers nor keywords")]
    EmptyCategory(ClauseCategory),

    #[error("bad term in category '{category}': {source}")]
    Term {
        category: ClauseCategory,
        #[source]
        source: TermError,
    },
}

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    #[serde(rename = "category", default)]
    categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    name: String,
    #[serde(default)]
    headers: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Compiled vocabulary for one category
#[derive(Debug, Clone)]
pub struct CategoryVocabulary {
    pub category: ClauseCategory,
    /// Matched against clause headings
    pub headers: Vec<TermPattern>,
    /// Matched against clause bodies
    pub keywords: Vec<TermPattern>,
}

/// Category vocabularies in [`ClauseCategory`] order
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: Vec<CategoryVocabulary>,
}

impl Vocabulary {
    /// The vocabulary shipped with the crate
    pub fn builtin() -> Result<Self, VocabularyError> {
        Self::from_toml_str(BUILTIN_VOCABULARY)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VocabularyError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, VocabularyError> {
        let file: VocabularyFile = toml::from_str(s)?;
        if file.categories.is_empty() {
            return Err(VocabularyError::NoCategories);
        }

        let mut entries: Vec<CategoryVocabulary> = Vec::with_capacity(file.categories.len());
        for entry in file.categories {
            let category: ClauseCategory = entry
                .name
                .parse()
                .map_err(|_| VocabularyError::UnknownCategory(entry.name.clone()))?;

            if category == ClauseCategory::Other {
                return Err(VocabularyError::ReservedCategory(category));
            }
            if entries.iter().any(|e| e.category == category) {
                return Err(VocabularyError::DuplicateCategory(category));
            }
            if entry.headers.is_empty() && entry.keywords.is_empty() {
                return Err(VocabularyError::EmptyCategory(category));
            }

            let compile = |terms: &[String]| {
                compile_terms(terms).map_err(|source| VocabularyError::Term { category, source })
            };
            entries.push(CategoryVocabulary {
                category,
                headers: compile(&entry.headers)?,
                keywords: compile(&entry.keywords)?,
            });
        }

        entries.sort_by_key(|e| e.category);
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CategoryVocabulary] {
        &self.entries
    }

    pub fn get(&self, category: ClauseCategory) -> Option<&CategoryVocabulary> {
        self.entries.iter().find(|e| e.category == category)
    }
}
