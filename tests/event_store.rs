//! Event Store Integration Tests
//!
//! Tests for event log format, append operations, and replay order.

use slidecast::core::{event_key, hash_input, EventStore};
use slidecast::domain::{Event, EventType, ProgressObservation};
use tempfile::TempDir;
use uuid::Uuid;

#[tokio::test]
async fn test_event_append_format() {
    let temp = TempDir::new().unwrap();
    let store = EventStore::open(temp.path()).await.unwrap();
    let run_id = Uuid::new_v4();

    let event = Event::new(
        run_id,
        Some(0),
        EventType::SlideCompleted,
        event_key(run_id, Some(0), "slide1_lecture.mp4"),
        "Slide 1 produced slide1_lecture.mp4".to_string(),
    )
    .with_duration(1200);
    store.append(&event).await.unwrap();

    // One JSON object per line
    let content = tokio::fs::read_to_string(store.events_path()).await.unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);

    let raw: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(raw["event_type"], "slide_completed");
    assert_eq!(raw["slide"], 0);
    assert_eq!(raw["duration_ms"], 1200);
    assert!(raw["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_event_replay_order() {
    let temp = TempDir::new().unwrap();
    let store = EventStore::open(temp.path()).await.unwrap();
    let run_id = Uuid::new_v4();

    for i in 0..5 {
        let event = Event::new(
            run_id,
            Some(i),
            EventType::Progress,
            event_key(run_id, Some(i), "progress"),
            format!("Slide {} accumulated", i + 1),
        )
        .with_progress(ProgressObservation {
            cursor: i + 1,
            total: 5,
            success_count: i + 1,
            failed_count: 0,
        });
        store.append(&event).await.unwrap();
    }

    let events = store.replay().await.unwrap();
    assert_eq!(events.len(), 5);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.slide, Some(i));
        assert_eq!(event.progress.map(|p| p.cursor), Some(i + 1));
    }
}

#[tokio::test]
async fn test_run_events_filter_by_run() {
    let temp = TempDir::new().unwrap();
    let store = EventStore::open(temp.path()).await.unwrap();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    for run_id in [first, second, first] {
        let event = Event::new(
            run_id,
            None,
            EventType::RunStarted,
            event_key(run_id, None, "start"),
            "Run started".to_string(),
        );
        store.append(&event).await.unwrap();
    }

    assert_eq!(store.run_events(first).await.unwrap().len(), 2);
    assert_eq!(store.run_events(second).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_replay_missing_file_is_empty() {
    let temp = TempDir::new().unwrap();
    let store = EventStore::open(&temp.path().join("fresh")).await.unwrap();

    assert!(store.replay().await.unwrap().is_empty());
    assert!(store
        .last_event_of_type(EventType::RunCompleted)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_event_types_serialization() {
    let event_types = vec![
        EventType::RunStarted,
        EventType::SlideCompleted,
        EventType::SlideFailed,
        EventType::Progress,
        EventType::MergeStarted,
        EventType::RunCompleted,
        EventType::RunFailed,
        EventType::StepCeilingReached,
    ];

    for event_type in event_types {
        let json = serde_json::to_string(&event_type).unwrap();
        let parsed: EventType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event_type);
    }
}

#[test]
fn test_event_key_format() {
    let run_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
    let key = event_key(run_id, Some(3), "slide4_lecture.mp4");

    // Format: {run_id}:{slide}:{hash}
    let parts: Vec<&str> = key.split(':').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "550e8400-e29b-41d4-a716-446655440000");
    assert_eq!(parts[1], "3");
    assert_eq!(parts[2].len(), 16);

    let run_key = event_key(run_id, None, "start");
    assert!(run_key.starts_with("550e8400-e29b-41d4-a716-446655440000:run:"));
}

#[test]
fn test_event_key_different_inputs() {
    let run_id = Uuid::new_v4();

    let key1 = event_key(run_id, Some(0), "input A");
    let key2 = event_key(run_id, Some(0), "input B");
    let key3 = event_key(run_id, Some(1), "input A");

    assert_ne!(key1, key2);
    assert_ne!(key1, key3);
}

#[test]
fn test_input_hash_consistency() {
    let hash1 = hash_input("test input");
    let hash2 = hash_input("test input");
    let hash3 = hash_input("different input");

    assert_eq!(hash1, hash2);
    assert_ne!(hash1, hash3);
    assert_eq!(hash1.len(), 16);
    assert_eq!(hash_input("unicode: 日本語").len(), 16);
    assert_eq!(hash_input("").len(), 16);
}
