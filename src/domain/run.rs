//! Run state threaded through the slide loop.
//!
//! `PipelineRunState` is created once per run and only mutated by the
//! accumulate stage; everything else reads it.

use serde::{Deserialize, Serialize};

use super::artifact::ArtifactRef;
use super::quiz::QuizItem;

/// Mutable context for one lecture run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRunState {
    /// Index of the slide currently being processed
    cursor: usize,

    /// Slide count, fixed at run start
    total: usize,

    /// Produced clips in the order they were accumulated
    artifacts: Vec<(usize, ArtifactRef)>,

    /// Slides whose stage sequence produced nothing usable
    failed_slides: Vec<usize>,
}

impl PipelineRunState {
    pub fn new(total: usize) -> Self {
        Self {
            cursor: 0,
            total,
            artifacts: Vec::new(),
            failed_slides: Vec::new(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn artifacts(&self) -> &[(usize, ArtifactRef)] {
        &self.artifacts
    }

    pub fn failed_slides(&self) -> &[usize] {
        &self.failed_slides
    }

    pub fn success_count(&self) -> usize {
        self.artifacts.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed_slides.len()
    }

    pub fn contains_artifact(&self, artifact: &ArtifactRef) -> bool {
        self.artifacts.iter().any(|(_, a)| a == artifact)
    }

    pub fn progress(&self) -> ProgressObservation {
        ProgressObservation {
            cursor: self.cursor,
            total: self.total,
            success_count: self.success_count(),
            failed_count: self.failed_count(),
        }
    }

    // Mutators are crate-private: only the accumulate stage writes run state.

    pub(crate) fn push_artifact(&mut self, slide_index: usize, artifact: ArtifactRef) {
        self.artifacts.push((slide_index, artifact));
    }

    pub(crate) fn push_failed(&mut self, slide_index: usize) {
        self.failed_slides.push(slide_index);
    }

    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }
}

/// Progress snapshot emitted after each slide is accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressObservation {
    pub cursor: usize,
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
}

impl ProgressObservation {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.cursor as f64 / self.total as f64 * 100.0
    }
}

/// Final result handed to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LectureOutput {
    /// Merged lecture clip
    pub final_artifact: ArtifactRef,

    /// Review quiz (empty if generation failed)
    pub quiz: Vec<QuizItem>,

    /// Number of slides that produced a clip
    pub succeeded: usize,

    /// 0-based indices of slides that failed
    pub failed_slides: Vec<usize>,
}
