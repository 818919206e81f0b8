//! Append-only run event log with file-based persistence.
//!
//! Events are stored as newline-delimited JSON (JSONL) in the run's work
//! directory for easy inspection after a run.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{Event, EventType};

pub const EVENTS_FILE: &str = "events.jsonl";

/// Event log for one work directory
#[derive(Debug, Clone)]
pub struct EventStore {
    events_path: PathBuf,
}

impl EventStore {
    /// Create or open the event log inside a work directory
    pub async fn open(work_dir: &Path) -> Result<Self> {
        fs::create_dir_all(work_dir)
            .await
            .with_context(|| format!("Failed to create work directory: {}", work_dir.display()))?;

        Ok(Self {
            events_path: work_dir.join(EVENTS_FILE),
        })
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Append one event as a single JSON line
    pub async fn append(&self, event: &Event) -> Result<()> {
        let mut line = serde_json::to_string(event).context("Failed to serialize event")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .await
            .with_context(|| format!("Failed to open event log: {}", self.events_path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .context("Failed to write event")?;
        file.flush().await.context("Failed to flush event log")
    }

    /// All recorded events in append order.
    ///
    /// A run killed mid-write can leave a partial last line; lines that do not
    /// parse are skipped with a warning rather than failing the replay.
    pub async fn replay(&self) -> Result<Vec<Event>> {
        let file = match File::open(&self.events_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to open event log: {}", self.events_path.display())
                })
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut events = Vec::new();
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await.context("Failed to read event log")? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(&line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(line = line_no, error = %e, "Skipping unreadable event"),
            }
        }
        Ok(events)
    }

    /// Events belonging to one run, in order
    pub async fn run_events(&self, run_id: Uuid) -> Result<Vec<Event>> {
        let events = self.replay().await?;
        Ok(events.into_iter().filter(|e| e.run_id == run_id).collect())
    }

    /// Most recent event of the given type, if any
    pub async fn last_event_of_type(&self, event_type: EventType) -> Result<Option<Event>> {
        let events = self.replay().await?;
        Ok(events.into_iter().rev().find(|e| e.event_type == event_type))
    }
}

/// Key identifying an event: "{run_id}:{slide}:{hash16}"
pub fn event_key(run_id: Uuid, slide: Option<usize>, detail: &str) -> String {
    let slide = slide.map_or_else(|| "run".to_string(), |s| s.to_string());
    format!("{}:{}:{}", run_id, slide, hash_input(detail))
}

/// First 16 hex chars of the SHA-256 of `input`
pub fn hash_input(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}
