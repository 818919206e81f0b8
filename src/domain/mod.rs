//! Domain types for slidecast.
//!
//! This module contains the core data structures:
//! - Slide / Deck: parsed slide content
//! - PipelineRunState: the slide loop's mutable context
//! - Retrieval types: search hits and content bundles
//! - Events: observational run log entries

pub mod artifact;
pub mod events;
pub mod narration;
pub mod quiz;
pub mod retrieval;
pub mod run;
pub mod slide;

// Re-export commonly used types
pub use artifact::{clip_file_name, ArtifactRef, ArtifactResolver, FsResolver};
pub use events::{Event, EventType};
pub use narration::NarrationSettings;
pub use quiz::{parse_quiz, QuizItem};
pub use retrieval::{
    ExternalContentBundle, Reference, RetrievalHit, ScoreDetail, SearchQuery, Summary,
};
pub use run::{LectureOutput, PipelineRunState, ProgressObservation};
pub use slide::{Deck, Slide, SlidePosition};
