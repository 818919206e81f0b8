//! Pipeline controller: the slide-iteration state machine.
//!
//! ```text
//! Init -> PerSlide(0) -> Accumulated(0) -> PerSlide(1) -> ... -> Accumulated(n-1)
//!      -> Merging -> Terminal
//! ```
//!
//! Every slide pass reaches `Accumulated` whether or not its stages
//! succeeded; the router alone decides between the next slide and the merge.
//! The loop is bounded by the step ceiling in [`SafetyLimits`].

use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    parse_quiz, ArtifactRef, ArtifactResolver, Deck, Event, EventType, FsResolver, LectureOutput,
    PipelineRunState, QuizItem,
};

use super::accumulate::accumulate;
use super::event_store::{event_key, EventStore};
use super::merge::{merge, MergeError};
use super::router::{route, Route};
use super::safety::{SafetyLimits, SafetyTracker, SafetyViolation};
use super::stages::{SlideInput, StageSequence};

/// Controller states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Init,
    /// Running the stage sequence for the slide at this index
    PerSlide(usize),
    /// The slide at this index has been folded into the run state
    Accumulated(usize),
    Merging,
    /// Run finished with the merged lecture
    Terminal(ArtifactRef),
}

/// Run-level fatal errors, distinct from per-slide failures
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Deck has no slides")]
    EmptyDeck,

    #[error("Step ceiling reached after {steps} slide passes (limit {limit})")]
    StepCeilingExceeded {
        steps: u32,
        limit: u32,
        state: PipelineRunState,
    },

    #[error("Merge failed: {source}")]
    Merge {
        #[source]
        source: MergeError,
        failed_slides: Vec<usize>,
    },
}

impl RunError {
    /// Slides that had failed when the run stopped
    pub fn failed_slides(&self) -> &[usize] {
        match self {
            RunError::EmptyDeck => &[],
            RunError::StepCeilingExceeded { state, .. } => state.failed_slides(),
            RunError::Merge { failed_slides, .. } => failed_slides,
        }
    }
}

/// Drives a deck through the stage sequence and merges the result
pub struct PipelineController {
    stages: StageSequence,
    limits: SafetyLimits,
    resolver: Box<dyn ArtifactResolver>,
    events: Option<EventStore>,
}

impl PipelineController {
    pub fn new(stages: StageSequence) -> Self {
        Self {
            stages,
            limits: SafetyLimits::default(),
            resolver: Box::new(FsResolver),
            events: None,
        }
    }

    pub fn with_limits(mut self, limits: SafetyLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn ArtifactResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Record run events to this store
    pub fn with_event_store(mut self, store: EventStore) -> Self {
        self.events = Some(store);
        self
    }

    fn work_dir(&self) -> PathBuf {
        self.stages.options().work_dir.clone()
    }

    /// Append an event; a failed write is logged and otherwise ignored
    async fn record(&self, event: Event) {
        if let Some(store) = &self.events {
            if let Err(e) = store.append(&event).await {
                warn!(error = %e, "Failed to record event");
            }
        }
    }

    /// Run the whole lecture pipeline for a deck
    #[instrument(skip(self, deck), fields(slides = deck.len()))]
    pub async fn run(&self, deck: &Deck) -> Result<LectureOutput, RunError> {
        if deck.is_empty() {
            return Err(RunError::EmptyDeck);
        }

        let run_id = Uuid::new_v4();
        let titles = deck.titles();
        let mut run_state = PipelineRunState::new(deck.len());
        let mut tracker = SafetyTracker::new();
        let mut scripts: Vec<String> = Vec::new();
        let mut state = ControllerState::Init;

        let final_artifact = loop {
            debug!(?state, "Controller state");
            state = match state {
                ControllerState::Init => {
                    info!(%run_id, slides = deck.len(), "Starting lecture run");
                    self.record(Event::new(
                        run_id,
                        None,
                        EventType::RunStarted,
                        event_key(run_id, None, "start"),
                        format!("Run started with {} slides", deck.len()),
                    ))
                    .await;
                    ControllerState::PerSlide(0)
                }

                ControllerState::PerSlide(index) => {
                    if let Err(SafetyViolation::MaxSteps { actual, limit }) = self.limits.check(&tracker) {
                        error!(steps = actual, limit, "Step ceiling reached");
                        self.record(
                            Event::new(
                                run_id,
                                Some(index),
                                EventType::StepCeilingReached,
                                event_key(run_id, Some(index), "ceiling"),
                                format!("Stopped after {} slide passes", actual),
                            )
                            .with_progress(run_state.progress()),
                        )
                        .await;
                        return Err(RunError::StepCeilingExceeded {
                            steps: actual,
                            limit,
                            state: run_state,
                        });
                    }
                    tracker.record_step();

                    let started = Instant::now();
                    let outcome = match deck.get(index) {
                        Some(slide) => {
                            self.stages
                                .run_slide(SlideInput {
                                    slide,
                                    index,
                                    total: deck.len(),
                                    titles: &titles,
                                    previous_script: scripts.last().map(String::as_str),
                                })
                                .await
                        }
                        None => Default::default(),
                    };
                    let elapsed_ms = started.elapsed().as_millis() as u64;

                    if let Some(script) = outcome.script {
                        scripts.push(script);
                    }

                    let artifact = outcome.artifact;
                    let detail = artifact
                        .as_ref()
                        .map(|a| a.file_name())
                        .unwrap_or_else(|| "none".to_string());
                    let failed_before = run_state.failed_count();
                    let progress = accumulate(&mut run_state, artifact, self.resolver.as_ref());

                    let event = if run_state.failed_count() > failed_before {
                        Event::new(
                            run_id,
                            Some(index),
                            EventType::SlideFailed,
                            event_key(run_id, Some(index), &detail),
                            format!("Slide {} failed", index + 1),
                        )
                        .with_error(outcome.error.unwrap_or_else(|| "artifact not resolvable".to_string()))
                    } else {
                        Event::new(
                            run_id,
                            Some(index),
                            EventType::SlideCompleted,
                            event_key(run_id, Some(index), &detail),
                            format!("Slide {} produced {}", index + 1, detail),
                        )
                    };
                    self.record(event.with_duration(elapsed_ms).with_progress(progress)).await;
                    self.record(
                        Event::new(
                            run_id,
                            Some(index),
                            EventType::Progress,
                            event_key(run_id, Some(index), "progress"),
                            format!("{}/{} slides ({:.0}%)", progress.cursor, progress.total, progress.percent()),
                        )
                        .with_progress(progress),
                    )
                    .await;

                    ControllerState::Accumulated(index)
                }

                ControllerState::Accumulated(index) => match route(&run_state) {
                    Route::Continue => ControllerState::PerSlide(index + 1),
                    Route::Done => ControllerState::Merging,
                },

                ControllerState::Merging => {
                    self.record(
                        Event::new(
                            run_id,
                            None,
                            EventType::MergeStarted,
                            event_key(run_id, None, "merge"),
                            format!("Merging {} clips", run_state.success_count()),
                        )
                        .with_progress(run_state.progress()),
                    )
                    .await;

                    let clips: Vec<ArtifactRef> =
                        run_state.artifacts().iter().map(|(_, a)| a.clone()).collect();
                    let encoder = self.stages.collaborators().encoder.clone();

                    match merge(&clips, encoder.as_ref(), &self.work_dir()).await {
                        Ok(artifact) => ControllerState::Terminal(artifact),
                        Err(source) => {
                            error!(error = %source, "Merge failed");
                            self.record(
                                Event::new(
                                    run_id,
                                    None,
                                    EventType::RunFailed,
                                    event_key(run_id, None, "failed"),
                                    "Merge failed".to_string(),
                                )
                                .with_error(source.to_string())
                                .with_progress(run_state.progress()),
                            )
                            .await;
                            return Err(RunError::Merge {
                                source,
                                failed_slides: run_state.failed_slides().to_vec(),
                            });
                        }
                    }
                }

                ControllerState::Terminal(artifact) => break artifact,
            };
        };

        let quiz = self.generate_quiz(&scripts).await;

        info!(
            %run_id,
            output = %final_artifact,
            succeeded = run_state.success_count(),
            failed = run_state.failed_count(),
            quiz_items = quiz.len(),
            elapsed_secs = tracker.elapsed_seconds(),
            "Lecture run completed"
        );
        self.record(
            Event::new(
                run_id,
                None,
                EventType::RunCompleted,
                event_key(run_id, None, "complete"),
                format!("Lecture written to {}", final_artifact),
            )
            .with_progress(run_state.progress()),
        )
        .await;

        Ok(LectureOutput {
            final_artifact,
            quiz,
            succeeded: run_state.success_count(),
            failed_slides: run_state.failed_slides().to_vec(),
        })
    }

    /// Quiz over all scripts; any failure yields an empty quiz
    async fn generate_quiz(&self, scripts: &[String]) -> Vec<QuizItem> {
        if scripts.is_empty() {
            return Vec::new();
        }
        match self.stages.collaborators().quiz.generate_quiz(scripts).await {
            Ok(reply) => parse_quiz(&reply),
            Err(e) => {
                warn!(error = %e, "Quiz generation failed");
                Vec::new()
            }
        }
    }
}
