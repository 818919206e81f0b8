//! Slide deck model.
//!
//! Slides arrive already materialized by an external parser. Extraction is
//! best-effort: every field may be missing and defaults to empty.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One slide's extracted content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slide {
    /// Title placeholder text
    pub title: String,

    /// Body text excluding title, shape text and links
    pub body_text: String,

    /// Tables on the slide, each a list of rows of cell text
    pub table_rows: Vec<Vec<Vec<String>>>,

    /// Extracted picture files
    pub image_paths: Vec<PathBuf>,

    /// Text from auto-shapes (deduplicated, in order)
    pub shape_texts: Vec<String>,

    /// Rendered snapshot of the whole slide, used as the clip background
    pub snapshot: Option<PathBuf>,
}

impl Slide {
    /// First table's first row, if any
    pub fn table_header(&self) -> Option<&[String]> {
        self.table_rows
            .first()
            .and_then(|t| t.first())
            .map(|row| row.as_slice())
            .filter(|row| !row.is_empty())
    }
}

/// Position of a slide within the lecture, used to shape narration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlidePosition {
    First,
    Middle,
    Last,
}

impl SlidePosition {
    pub fn of(index: usize, total: usize) -> Self {
        if index == 0 {
            Self::First
        } else if index + 1 >= total {
            Self::Last
        } else {
            Self::Middle
        }
    }
}

/// An ordered, already-parsed slide deck
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub slides: Vec<Slide>,
}

impl Deck {
    pub fn new(slides: Vec<Slide>) -> Self {
        Self { slides }
    }

    /// Load a deck manifest (JSON) written by the slide parser
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deck manifest: {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse deck manifest JSON")
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    pub fn titles(&self) -> Vec<String> {
        self.slides.iter().map(|s| s.title.clone()).collect()
    }
}
