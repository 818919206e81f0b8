//! The fixed per-slide stage sequence.
//!
//! search -> content synthesis -> narration script -> speech -> clip render.
//! Search degrades gracefully (a failed query contributes no hits); a failure
//! in any later stage ends the pass for that slide without a clip.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::adapters::{
    ContentRequest, ContentSynthesizer, MediaEncoder, NarrationRequest, NarrationWriter,
    QuizGenerator, SearchClient, SpeechSynthesizer,
};
use crate::domain::{ArtifactRef, ExternalContentBundle, NarrationSettings, RetrievalHit, Slide};
use crate::retrieval::{build_bundle, build_summary_block, dedup_by_url, plan_queries, PromptBudget};

/// External collaborators used by a run
#[derive(Clone)]
pub struct Collaborators {
    pub search: Arc<dyn SearchClient>,
    pub content: Arc<dyn ContentSynthesizer>,
    pub narration: Arc<dyn NarrationWriter>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub encoder: Arc<dyn MediaEncoder>,
    pub quiz: Arc<dyn QuizGenerator>,
}

/// Knobs for the stage sequence
#[derive(Debug, Clone)]
pub struct StageOptions {
    /// Directory receiving audio and clips
    pub work_dir: PathBuf,
    pub settings: NarrationSettings,
    pub budget: PromptBudget,
    /// Hits requested per search query
    pub results_per_query: usize,
    /// Pause between consecutive search queries
    pub query_pause: Duration,
}

impl StageOptions {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            settings: NarrationSettings::default(),
            budget: PromptBudget::default(),
            results_per_query: 4,
            query_pause: Duration::from_millis(200),
        }
    }
}

/// Inputs for one slide pass
#[derive(Debug, Clone, Copy)]
pub struct SlideInput<'a> {
    pub slide: &'a Slide,
    pub index: usize,
    pub total: usize,
    pub titles: &'a [String],
    pub previous_script: Option<&'a str>,
}

/// What one slide pass produced
#[derive(Debug, Clone, Default)]
pub struct SlideOutcome {
    /// Rendered clip, absent when any stage failed
    pub artifact: Option<ArtifactRef>,
    /// Narration script, kept even when later stages failed
    pub script: Option<String>,
    /// Error that ended the pass early
    pub error: Option<String>,
}

/// Runs the stage sequence for a single slide
pub struct StageSequence {
    collaborators: Collaborators,
    options: StageOptions,
}

impl StageSequence {
    pub fn new(collaborators: Collaborators, options: StageOptions) -> Self {
        Self {
            collaborators,
            options,
        }
    }

    pub fn options(&self) -> &StageOptions {
        &self.options
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Run every stage for one slide. Never fails: stage errors are captured
    /// in the outcome.
    #[instrument(skip(self, input), fields(slide = input.index + 1))]
    pub async fn run_slide(&self, input: SlideInput<'_>) -> SlideOutcome {
        let bundle = self.retrieve(input.slide).await;

        let mut outcome = SlideOutcome::default();
        let script = match self.compose_script(&input, &bundle).await {
            Ok(script) => script,
            Err(e) => {
                warn!(error = %e, "Script stages failed");
                outcome.error = Some(format!("{:#}", e));
                return outcome;
            }
        };
        outcome.script = Some(script.clone());

        match self.produce_clip(&input, &script).await {
            Ok(artifact) => outcome.artifact = Some(artifact),
            Err(e) => {
                warn!(error = %e, "Media stages failed");
                outcome.error = Some(format!("{:#}", e));
            }
        }
        outcome
    }

    /// Search every planned query and rank the gathered hits
    pub async fn retrieve(&self, slide: &Slide) -> ExternalContentBundle {
        let queries = plan_queries(slide);
        let search = &self.collaborators.search;
        let mut hits: Vec<RetrievalHit> = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.options.query_pause.is_zero() {
                tokio::time::sleep(self.options.query_pause).await;
            }
            match search.search(&query.text, self.options.results_per_query).await {
                Ok(found) => {
                    debug!(context = %query.context, hits = found.len(), "Query searched");
                    hits.extend(found);
                }
                Err(e) => warn!(adapter = search.name(), query = %query.text, error = %e, "Search failed"),
            }
        }

        let hits = dedup_by_url(hits);
        let bundle = build_bundle(queries, &hits);
        info!(
            hits = hits.len(),
            summaries = bundle.summaries.len(),
            references = bundle.references.len(),
            "Retrieval complete"
        );
        bundle
    }

    async fn compose_script(&self, input: &SlideInput<'_>, bundle: &ExternalContentBundle) -> Result<String> {
        let settings = &self.options.settings;
        let summary_block = build_summary_block(&bundle.summaries, &self.options.budget);

        let page_content = self
            .collaborators
            .content
            .synthesize(ContentRequest {
                slide: input.slide,
                slide_index: input.index,
                bundle,
                summary_block: &summary_block,
                settings,
            })
            .await
            .context("Content synthesis failed")?;

        self.collaborators
            .narration
            .write_script(NarrationRequest {
                titles: input.titles,
                slide_index: input.index,
                total: input.total,
                page_content: &page_content,
                previous_script: input.previous_script,
                settings,
            })
            .await
            .context("Narration failed")
    }

    async fn produce_clip(&self, input: &SlideInput<'_>, script: &str) -> Result<ArtifactRef> {
        let work_dir: &Path = &self.options.work_dir;
        let settings = &self.options.settings;

        let image = input
            .slide
            .snapshot
            .as_deref()
            .context("Slide has no snapshot image")?;

        let audio = self
            .collaborators
            .speech
            .speak(script, input.index, settings, work_dir)
            .await
            .context("Speech synthesis failed")?;

        self.collaborators
            .encoder
            .render_clip(image, &audio, input.index, settings.padding_sec, work_dir)
            .await
            .context("Clip render failed")
    }
}
