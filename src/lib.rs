//! slidecast - Slide deck to narrated lecture pipeline
//!
//! Drives every slide of a parsed deck through a fixed stage sequence
//! (web search, content synthesis, narration, speech, clip render),
//! tolerating per-slide failures, then merges the clips into one lecture
//! and generates a review quiz.
//!
//! # Architecture
//!
//! - A state machine owns the run state and loops over slides until the
//!   router says every slide has been visited
//! - Search results are scored, grouped into near-duplicates and filtered
//!   by corroboration before being budgeted into the synthesis prompt
//! - Every external service sits behind a trait, so runs can be driven by
//!   in-memory fakes
//!
//! # Modules
//!
//! - `adapters`: External collaborators (Tavily, OpenAI, ffmpeg)
//! - `core`: Controller, stage sequence, accumulate, router, merge, events
//! - `domain`: Data structures (Slide, PipelineRunState, RetrievalHit, Event)
//! - `retrieval`: Scoring, ranking and prompt budgeting
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Build a lecture from a deck manifest
//! slidecast run deck.json --voice "tech seminar -onyx"
//!
//! # Rank saved search hits
//! slidecast rank hits.json --query "rust ownership"
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod retrieval;

// Re-export main types at crate root for convenience
pub use crate::core::{PipelineController, RunError, StageSequence};
pub use crate::domain::{Deck, LectureOutput, PipelineRunState, RetrievalHit, Slide};
