//! Adapter interfaces for external collaborators.
//!
//! Each stage of a slide pass talks to one collaborator through a narrow
//! trait so the pipeline can run against real services (web search, a
//! language model, speech synthesis, ffmpeg) or in-memory fakes.

pub mod ffmpeg;
pub mod openai;
pub mod prompts;
pub mod tavily;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{ArtifactRef, ExternalContentBundle, NarrationSettings, RetrievalHit, Slide};

pub use ffmpeg::FfmpegEncoder;
pub use openai::OpenAiClient;
pub use tavily::TavilySearch;

/// Web search returning scored hits
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Up to `limit` scored hits for the query, best first
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievalHit>>;
}

/// Everything content synthesis sees for one slide
#[derive(Debug, Clone, Copy)]
pub struct ContentRequest<'a> {
    pub slide: &'a Slide,
    pub slide_index: usize,
    pub bundle: &'a ExternalContentBundle,
    /// Budgeted `[source] chunk` block built from the bundle's summaries
    pub summary_block: &'a str,
    pub settings: &'a NarrationSettings,
}

/// Writes the explanatory page content for a slide
#[async_trait]
pub trait ContentSynthesizer: Send + Sync {
    async fn synthesize(&self, request: ContentRequest<'_>) -> Result<String>;
}

/// Everything the narration writer sees for one slide
#[derive(Debug, Clone, Copy)]
pub struct NarrationRequest<'a> {
    /// Titles of the whole deck, as a table of contents
    pub titles: &'a [String],
    pub slide_index: usize,
    pub total: usize,
    pub page_content: &'a str,
    /// Script of the previous slide, for continuity
    pub previous_script: Option<&'a str>,
    pub settings: &'a NarrationSettings,
}

/// Turns page content into a spoken lecture script
#[async_trait]
pub trait NarrationWriter: Send + Sync {
    async fn write_script(&self, request: NarrationRequest<'_>) -> Result<String>;
}

/// Text-to-speech producing an audio file
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(
        &self,
        script: &str,
        slide_index: usize,
        settings: &NarrationSettings,
        work_dir: &Path,
    ) -> Result<ArtifactRef>;
}

/// Media encoding: per-slide clips and the final concatenation
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Render a still-image clip for a slide; owns its own retry policy
    async fn render_clip(
        &self,
        image: &Path,
        audio: &ArtifactRef,
        slide_index: usize,
        padding_sec: f32,
        work_dir: &Path,
    ) -> Result<ArtifactRef>;

    /// Concatenate clips, already in playback order, into `output`
    async fn concat(&self, clips: &[ArtifactRef], output: &Path) -> Result<ArtifactRef>;
}

/// Produces a raw quiz reply (JSON array expected) from the lecture scripts
#[async_trait]
pub trait QuizGenerator: Send + Sync {
    async fn generate_quiz(&self, scripts: &[String]) -> Result<String>;
}
