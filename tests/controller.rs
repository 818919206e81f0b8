//! Pipeline Controller Integration Tests
//!
//! Drives whole runs against in-memory collaborators that write real files
//! into a temporary work directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use slidecast::adapters::{
    ContentRequest, ContentSynthesizer, MediaEncoder, NarrationRequest, NarrationWriter,
    QuizGenerator, SearchClient, SpeechSynthesizer,
};
use slidecast::core::{
    Collaborators, EventStore, MergeError, PipelineController, RunError, SafetyLimits,
    StageOptions, StageSequence,
};
use slidecast::domain::{
    clip_file_name, ArtifactRef, ArtifactResolver, Deck, EventType, NarrationSettings,
    RetrievalHit, Slide,
};
use slidecast::retrieval::score_hit;

struct FakeSearch {
    fail: bool,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl SearchClient for FakeSearch {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<RetrievalHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            anyhow::bail!("search offline");
        }
        Ok(vec![score_hit(
            query,
            "Reference",
            &format!("https://docs.python.org/{}", query.len()),
            "A reference snippet about the topic.",
        )])
    }
}

struct FakeContent;

#[async_trait]
impl ContentSynthesizer for FakeContent {
    async fn synthesize(&self, request: ContentRequest<'_>) -> Result<String> {
        Ok(format!("Content for {}", request.slide.title))
    }
}

#[derive(Default)]
struct FakeNarration {
    previous: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl NarrationWriter for FakeNarration {
    async fn write_script(&self, request: NarrationRequest<'_>) -> Result<String> {
        self.previous
            .lock()
            .unwrap()
            .push(request.previous_script.map(str::to_string));
        Ok(format!("Script {}", request.slide_index + 1))
    }
}

/// Writes an audio file, failing for the listed slides
struct FakeSpeech {
    fail_on: HashSet<usize>,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn speak(
        &self,
        script: &str,
        slide_index: usize,
        _settings: &NarrationSettings,
        work_dir: &Path,
    ) -> Result<ArtifactRef> {
        if self.fail_on.contains(&slide_index) {
            anyhow::bail!("speech rejected");
        }
        let path = work_dir.join(format!("tts_slide{}.mp3", slide_index));
        tokio::fs::write(&path, script).await?;
        Ok(ArtifactRef::new(path))
    }
}

#[derive(Default)]
struct FakeEncoder {
    concatenated: Mutex<Vec<String>>,
    fail_concat: bool,
}

#[async_trait]
impl MediaEncoder for FakeEncoder {
    async fn render_clip(
        &self,
        _image: &Path,
        _audio: &ArtifactRef,
        slide_index: usize,
        _padding_sec: f32,
        work_dir: &Path,
    ) -> Result<ArtifactRef> {
        let path = work_dir.join(clip_file_name(slide_index));
        tokio::fs::write(&path, b"clip").await?;
        Ok(ArtifactRef::new(path))
    }

    async fn concat(&self, clips: &[ArtifactRef], output: &Path) -> Result<ArtifactRef> {
        if self.fail_concat {
            anyhow::bail!("encoder crashed");
        }
        *self.concatenated.lock().unwrap() = clips.iter().map(|c| c.file_name()).collect();
        tokio::fs::write(output, b"lecture").await?;
        Ok(ArtifactRef::new(output))
    }
}

struct FakeQuiz {
    reply: Option<String>,
}

#[async_trait]
impl QuizGenerator for FakeQuiz {
    async fn generate_quiz(&self, _scripts: &[String]) -> Result<String> {
        self.reply.clone().ok_or_else(|| anyhow::anyhow!("quiz model down"))
    }
}

const QUIZ_REPLY: &str = r#"[
  {"question": "Q1", "options": ["1. a", "2. b", "3. c", "4. d"], "answer": "2", "explanation": "b"},
  {"question": "Q2", "options": ["1. a", "2. b", "3. c", "4. d"], "answer": "4", "explanation": "d"}
]"#;

struct Harness {
    temp: TempDir,
    search: Arc<FakeSearch>,
    narration: Arc<FakeNarration>,
    encoder: Arc<FakeEncoder>,
    fail_speech_on: Vec<usize>,
    quiz_reply: Option<String>,
    search_fails: bool,
}

impl Harness {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
            search: Arc::new(FakeSearch {
                fail: false,
                queries: Mutex::new(Vec::new()),
            }),
            narration: Arc::new(FakeNarration::default()),
            encoder: Arc::new(FakeEncoder::default()),
            fail_speech_on: Vec::new(),
            quiz_reply: Some(QUIZ_REPLY.to_string()),
            search_fails: false,
        }
    }

    fn work_dir(&self) -> PathBuf {
        self.temp.path().to_path_buf()
    }

    fn controller(&mut self) -> PipelineController {
        if self.search_fails {
            self.search = Arc::new(FakeSearch {
                fail: true,
                queries: Mutex::new(Vec::new()),
            });
        }
        let collaborators = Collaborators {
            search: self.search.clone(),
            content: Arc::new(FakeContent),
            narration: self.narration.clone(),
            speech: Arc::new(FakeSpeech {
                fail_on: self.fail_speech_on.iter().copied().collect(),
            }),
            encoder: self.encoder.clone(),
            quiz: Arc::new(FakeQuiz {
                reply: self.quiz_reply.clone(),
            }),
        };
        let mut options = StageOptions::new(self.work_dir());
        options.query_pause = Duration::ZERO;
        PipelineController::new(StageSequence::new(collaborators, options))
    }
}

fn deck(n: usize) -> Deck {
    Deck::new(
        (0..n)
            .map(|i| Slide {
                title: format!("Topic {}", i + 1),
                body_text: "Some body text.".to_string(),
                snapshot: Some(PathBuf::from(format!("slide{}.png", i + 1))),
                ..Default::default()
            })
            .collect(),
    )
}

#[tokio::test]
async fn test_single_failed_slide_is_fatal_at_merge() {
    let mut harness = Harness::new();
    harness.fail_speech_on = vec![0];
    let controller = harness.controller();

    let err = assert_err!(controller.run(&deck(1)).await);
    assert!(matches!(
        err,
        RunError::Merge {
            source: MergeError::NothingToMerge,
            ..
        }
    ));
    assert_eq!(err.failed_slides(), &[0]);
    assert!(harness.encoder.concatenated.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_partial_failure_merges_survivors_in_order() {
    let mut harness = Harness::new();
    harness.fail_speech_on = vec![1];
    let controller = harness.controller();

    let output = assert_ok!(controller.run(&deck(3)).await);

    assert_eq!(output.succeeded, 2);
    assert_eq!(output.failed_slides, vec![1]);
    assert_eq!(
        *harness.encoder.concatenated.lock().unwrap(),
        vec!["slide1_lecture.mp4".to_string(), "slide3_lecture.mp4".to_string()]
    );
    assert_eq!(output.final_artifact.file_name(), "final_lecture.mp4");
    assert_eq!(output.quiz.len(), 2);
}

#[tokio::test]
async fn test_narration_sees_previous_script() {
    let mut harness = Harness::new();
    let controller = harness.controller();

    assert_ok!(controller.run(&deck(3)).await);

    let previous = harness.narration.previous.lock().unwrap().clone();
    assert_eq!(
        previous,
        vec![None, Some("Script 1".to_string()), Some("Script 2".to_string())]
    );
}

#[tokio::test]
async fn test_step_ceiling_is_a_distinct_fatal_error() {
    let mut harness = Harness::new();
    let controller = harness.controller().with_limits(SafetyLimits {
        max_steps: 2,
        ..Default::default()
    });

    let err = assert_err!(controller.run(&deck(5)).await);
    match err {
        RunError::StepCeilingExceeded { steps, limit, state } => {
            assert_eq!(steps, 2);
            assert_eq!(limit, 2);
            assert_eq!(state.cursor(), 2);
            assert_eq!(state.success_count(), 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Treats every artifact as missing
struct RejectAll;

impl ArtifactResolver for RejectAll {
    fn is_resolvable(&self, _artifact: &ArtifactRef) -> bool {
        false
    }
}

#[tokio::test]
async fn test_unresolvable_clips_count_as_failures() {
    let mut harness = Harness::new();
    let controller = harness.controller().with_resolver(Box::new(RejectAll));

    let err = assert_err!(controller.run(&deck(2)).await);
    assert!(matches!(
        err,
        RunError::Merge {
            source: MergeError::NothingToMerge,
            ..
        }
    ));
    assert_eq!(err.failed_slides(), &[0, 1]);
}

#[tokio::test]
async fn test_empty_deck_rejected() {
    let mut harness = Harness::new();
    let controller = harness.controller();

    let err = assert_err!(controller.run(&Deck::default()).await);
    assert!(matches!(err, RunError::EmptyDeck));
}

#[tokio::test]
async fn test_search_failures_do_not_fail_slides() {
    let mut harness = Harness::new();
    harness.search_fails = true;
    let controller = harness.controller();

    let output = assert_ok!(controller.run(&deck(2)).await);
    assert_eq!(output.succeeded, 2);
    assert!(output.failed_slides.is_empty());
    assert!(!harness.search.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_snapshot_fails_only_that_slide() {
    let mut harness = Harness::new();
    let controller = harness.controller();
    let mut deck = deck(2);
    deck.slides[0].snapshot = None;

    let output = assert_ok!(controller.run(&deck).await);
    assert_eq!(output.failed_slides, vec![0]);
    assert_eq!(output.succeeded, 1);
}

#[tokio::test]
async fn test_quiz_failure_yields_empty_quiz() {
    let mut harness = Harness::new();
    harness.quiz_reply = None;
    let controller = harness.controller();

    let output = assert_ok!(controller.run(&deck(1)).await);
    assert!(output.quiz.is_empty());

    harness.quiz_reply = Some("not json at all".to_string());
    let controller = harness.controller();
    let output = assert_ok!(controller.run(&deck(1)).await);
    assert!(output.quiz.is_empty());
}

#[tokio::test]
async fn test_encoder_failure_reported_as_merge_error() {
    let mut harness = Harness::new();
    harness.encoder = Arc::new(FakeEncoder {
        fail_concat: true,
        ..Default::default()
    });
    let controller = harness.controller();

    let err = assert_err!(controller.run(&deck(2)).await);
    assert!(matches!(
        err,
        RunError::Merge {
            source: MergeError::Encoder(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_run_events_recorded() {
    let mut harness = Harness::new();
    harness.fail_speech_on = vec![1];
    let store = EventStore::open(&harness.work_dir()).await.unwrap();
    let controller = harness.controller().with_event_store(store.clone());

    assert_ok!(controller.run(&deck(3)).await);

    let events = store.replay().await.unwrap();
    let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            EventType::RunStarted,
            EventType::SlideCompleted,
            EventType::Progress,
            EventType::SlideFailed,
            EventType::Progress,
            EventType::SlideCompleted,
            EventType::Progress,
            EventType::MergeStarted,
            EventType::RunCompleted,
        ]
    );

    let failed = &events[3];
    assert_eq!(failed.slide, Some(1));
    assert!(failed.error.as_deref().unwrap_or("").contains("Speech synthesis failed"));
    assert_eq!(failed.progress.map(|p| (p.cursor, p.failed_count)), Some((2, 1)));

    let cursors: Vec<usize> = events
        .iter()
        .filter(|e| e.event_type == EventType::Progress)
        .filter_map(|e| e.progress.map(|p| p.cursor))
        .collect();
    assert_eq!(cursors, vec![1, 2, 3]);
}
