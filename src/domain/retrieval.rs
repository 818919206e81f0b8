//! Search hits and the content bundle handed to content synthesis.

use serde::{Deserialize, Serialize};

/// Breakdown of a hit's score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub similarity: f64,
    pub domain_trust: f64,
    pub content: f64,
}

/// One scored search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub domain: String,
    /// Weighted score in [0, 1]
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub score_detail: ScoreDetail,
}

/// A search query formed from one slide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    /// Which slide fields produced the query (e.g. "title+table")
    pub context: String,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: context.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub source: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
    pub score: f64,
}

/// Supplementary material for one slide.
///
/// Built once per slide pass and read by content synthesis; never mutated
/// after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalContentBundle {
    pub queries: Vec<SearchQuery>,
    pub summaries: Vec<Summary>,
    pub references: Vec<Reference>,
}

impl ExternalContentBundle {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.references.is_empty()
    }
}
