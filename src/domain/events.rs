//! Events recorded while a lecture run progresses.
//!
//! Events are observational: they are appended to the run's event log for
//! inspection and never drive control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::run::ProgressObservation;

/// A single event in the append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The run this event belongs to
    pub run_id: Uuid,

    /// 0-based slide index (if applicable)
    pub slide: Option<usize>,

    /// Type of event
    pub event_type: EventType,

    /// Key format: "{run_id}:{slide}:{hash}"
    pub idempotency_key: String,

    /// Human-readable summary (NO secrets)
    pub payload_summary: String,

    /// Progress after the slide was accumulated
    pub progress: Option<ProgressObservation>,

    /// Time taken in milliseconds (for slide passes)
    pub duration_ms: Option<u64>,

    /// Error message if failed
    pub error: Option<String>,
}

impl Event {
    /// Create a new event with the current timestamp
    pub fn new(
        run_id: Uuid,
        slide: Option<usize>,
        event_type: EventType,
        idempotency_key: String,
        payload_summary: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            run_id,
            slide,
            event_type,
            idempotency_key,
            payload_summary,
            progress: None,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressObservation) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Types of events that can occur during a lecture run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A new run has started
    RunStarted,

    /// A slide produced a clip
    SlideCompleted,

    /// A slide produced nothing usable
    SlideFailed,

    /// Progress after accumulation
    Progress,

    /// Clips are being merged
    MergeStarted,

    /// The run produced a merged lecture
    RunCompleted,

    /// The run ended with a fatal error
    RunFailed,

    /// The step ceiling halted the run
    StepCeilingReached,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::new(
            Uuid::new_v4(),
            Some(2),
            EventType::SlideCompleted,
            "test-key".to_string(),
            "Slide 3 completed".to_string(),
        );

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.event_type, EventType::SlideCompleted);
        assert_eq!(parsed.slide, Some(2));
        assert!(json.contains("\"slide_completed\""));
    }

    #[test]
    fn test_event_with_progress_and_error() {
        let progress = ProgressObservation {
            cursor: 1,
            total: 3,
            success_count: 0,
            failed_count: 1,
        };
        let event = Event::new(
            Uuid::new_v4(),
            Some(0),
            EventType::SlideFailed,
            "test-key".to_string(),
            "Slide 1 failed".to_string(),
        )
        .with_progress(progress)
        .with_duration(1500)
        .with_error("clip missing".to_string());

        assert_eq!(event.progress, Some(progress));
        assert_eq!(event.duration_ms, Some(1500));
        assert_eq!(event.error.as_deref(), Some("clip missing"));
    }
}
