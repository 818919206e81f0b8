//! Core orchestration logic.
//!
//! This module contains:
//! - Controller: the slide-iteration state machine
//! - Stages: the fixed per-slide stage sequence
//! - Accumulate / Router: run-state folding and loop routing
//! - Merge: clip ordering, validation and concatenation
//! - EventStore: append-only run event log
//! - Safety: step ceiling

pub mod accumulate;
pub mod controller;
pub mod event_store;
pub mod merge;
pub mod router;
pub mod safety;
pub mod stages;

// Re-export commonly used types
pub use accumulate::accumulate;
pub use controller::{ControllerState, PipelineController, RunError};
pub use event_store::{event_key, hash_input, EventStore};
pub use merge::{merge, order_artifacts, MergeError, FINAL_FILE_NAME};
pub use router::{route, Route};
pub use safety::{SafetyLimits, SafetyTracker, SafetyViolation};
pub use stages::{Collaborators, SlideInput, SlideOutcome, StageOptions, StageSequence};
