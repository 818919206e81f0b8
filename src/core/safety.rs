//! Safety limits for a lecture run.
//!
//! The slide loop is bounded by an explicit step ceiling so termination does
//! not depend on the slide count being sane.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Safety limits for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Maximum slide passes per run (default: 200)
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Maximum characters of narration sent to speech synthesis (default: 4000)
    #[serde(default = "default_max_script_chars")]
    pub max_script_chars: usize,
}

fn default_max_steps() -> u32 {
    200
}
fn default_max_script_chars() -> usize {
    4000
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_script_chars: default_max_script_chars(),
        }
    }
}

impl SafetyLimits {
    /// Check current tracker state against limits
    pub fn check(&self, tracker: &SafetyTracker) -> Result<(), SafetyViolation> {
        if tracker.steps_executed >= self.max_steps {
            return Err(SafetyViolation::MaxSteps {
                actual: tracker.steps_executed,
                limit: self.max_steps,
            });
        }
        Ok(())
    }
}

/// Tracks resource usage during a run
#[derive(Debug, Clone)]
pub struct SafetyTracker {
    /// Number of slide passes executed
    pub steps_executed: u32,

    /// When the run started
    pub started_at: Instant,
}

impl Default for SafetyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyTracker {
    pub fn new() -> Self {
        Self {
            steps_executed: 0,
            started_at: Instant::now(),
        }
    }

    /// Record a slide pass
    pub fn record_step(&mut self) {
        self.steps_executed += 1;
    }

    /// Get elapsed time in seconds
    pub fn elapsed_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Safety violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyViolation {
    #[error("Maximum steps exceeded: {actual} >= {limit}")]
    MaxSteps { actual: u32, limit: u32 },
}
