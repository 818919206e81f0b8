//! Command-line interface for slidecast.
//!
//! Provides commands for turning a deck into a narrated lecture, ranking a
//! saved list of search hits, and inspecting the resolved configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::openai::OpenAiModels;
use crate::adapters::{FfmpegEncoder, OpenAiClient, TavilySearch};
use crate::config::{self, ResolvedConfig};
use crate::core::{
    Collaborators, EventStore, PipelineController, RunError, SafetyLimits, StageOptions,
    StageSequence,
};
use crate::domain::{Deck, NarrationSettings, RetrievalHit, SearchQuery};
use crate::retrieval::{build_bundle, build_summary_block, dedup_by_url, score_hit};

/// slidecast - Slide deck to narrated lecture pipeline
#[derive(Parser, Debug)]
#[command(name = "slidecast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Turn a deck manifest into a narrated lecture video and quiz
    Run {
        /// Deck manifest (JSON) produced by the slide parser
        deck: PathBuf,

        /// Output directory (default: <work_dir>/<deck name>)
        #[arg(short, long)]
        work_dir: Option<PathBuf>,

        /// Speaking tone
        #[arg(long)]
        tone: Option<String>,

        /// Voice preset, e.g. "tech seminar -onyx"
        #[arg(long)]
        voice: Option<String>,

        /// Delivery style
        #[arg(long)]
        style: Option<String>,

        /// Target narration length per slide, in seconds
        #[arg(long)]
        duration: Option<u32>,

        /// Playback speed (0.5 to 2.0)
        #[arg(long)]
        speed: Option<f32>,

        /// Maximum slide passes before the run is aborted
        #[arg(long)]
        max_steps: Option<u32>,
    },

    /// Rank a saved list of search hits and print the resulting bundle
    Rank {
        /// JSON array of hits ({title, url, snippet, ...})
        hits: PathBuf,

        /// Re-score every hit against this query
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run {
                deck,
                work_dir,
                tone,
                voice,
                style,
                duration,
                speed,
                max_steps,
            } => {
                let cfg = config::config()?;
                let mut settings = cfg.narration.clone();
                apply_overrides(&mut settings, tone, voice, style, duration, speed);
                let mut limits = cfg.safety.clone();
                if let Some(max_steps) = max_steps {
                    limits.max_steps = max_steps;
                }
                run_lecture(cfg, &deck, work_dir, settings, limits).await
            }
            Commands::Rank { hits, query } => {
                let cfg = config::config()?;
                rank_hits_file(cfg, &hits, query.as_deref())
            }
            Commands::Config => show_config(),
        }
    }
}

fn apply_overrides(
    settings: &mut NarrationSettings,
    tone: Option<String>,
    voice: Option<String>,
    style: Option<String>,
    duration: Option<u32>,
    speed: Option<f32>,
) {
    if let Some(tone) = tone {
        settings.tone = tone;
    }
    if let Some(voice) = voice {
        settings.voice = voice;
    }
    if let Some(style) = style {
        settings.style = style;
    }
    if let Some(duration) = duration {
        settings.target_duration_sec = duration;
    }
    if let Some(speed) = speed {
        settings.speed = speed;
    }
}

/// Output directory for a deck when none is given
fn default_run_dir(base: &Path, deck: &Path) -> PathBuf {
    let name = deck
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("lecture");
    base.join(name)
}

/// Run the full pipeline for a deck
async fn run_lecture(
    cfg: &ResolvedConfig,
    deck_path: &Path,
    work_dir: Option<PathBuf>,
    settings: NarrationSettings,
    limits: SafetyLimits,
) -> Result<()> {
    let deck = Deck::from_file(deck_path)?;
    let work_dir = work_dir.unwrap_or_else(|| default_run_dir(&cfg.work_dir, deck_path));

    let openai_key = cfg
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY is not set")?;
    let tavily_key = cfg
        .tavily_api_key
        .clone()
        .context("TAVILY_API_KEY is not set")?;

    let timeout = cfg.search.request_timeout;
    let mut search = TavilySearch::new(tavily_key, cfg.search.excluded_domains.clone(), timeout)?;
    if let Some(endpoint) = &cfg.search.endpoint {
        search = search.with_endpoint(endpoint.clone());
    }

    let encoder = FfmpegEncoder::with_binaries(cfg.media.ffmpeg.clone(), cfg.media.ffprobe.clone())
        .with_timeout(cfg.media.process_timeout);

    let models = OpenAiModels {
        chat: cfg.llm_model.clone(),
        speech: cfg.tts_model.clone(),
    };
    let mut openai = OpenAiClient::new(openai_key, models, timeout)?
        .with_max_script_chars(limits.max_script_chars)
        .with_encoder(encoder.clone());
    if let Some(base_url) = &cfg.openai_base_url {
        openai = openai.with_base_url(base_url.clone());
    }
    let openai = Arc::new(openai);

    let collaborators = Collaborators {
        search: Arc::new(search),
        content: openai.clone(),
        narration: openai.clone(),
        speech: openai.clone(),
        encoder: Arc::new(encoder),
        quiz: openai,
    };
    let options = StageOptions {
        work_dir: work_dir.clone(),
        settings,
        budget: cfg.budget,
        results_per_query: cfg.search.results_per_query,
        query_pause: cfg.search.query_pause,
    };

    let events = EventStore::open(&work_dir).await?;
    let events_path = events.events_path().to_path_buf();
    let controller = PipelineController::new(StageSequence::new(collaborators, options))
        .with_limits(limits)
        .with_event_store(events);

    eprintln!("Processing {} slides into {}", deck.len(), work_dir.display());

    match controller.run(&deck).await {
        Ok(output) => {
            eprintln!("\n[Lecture completed]");
            eprintln!("  Video:    {}", output.final_artifact);
            eprintln!("  Slides:   {} succeeded, {} failed", output.succeeded, output.failed_slides.len());
            if !output.failed_slides.is_empty() {
                let failed: Vec<String> = output.failed_slides.iter().map(|i| (i + 1).to_string()).collect();
                eprintln!("  Failed:   {}", failed.join(", "));
            }
            eprintln!("  Events:   {}", events_path.display());
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize output")?
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("\n[Lecture failed: {}]", e);
            if let RunError::Merge { failed_slides, .. } = &e {
                eprintln!("  Failed slides: {:?}", failed_slides);
            }
            eprintln!("  Events: {}", events_path.display());
            Err(e.into())
        }
    }
}

/// Rank hits from a file and print the bundle and budgeted block
fn rank_hits_file(cfg: &ResolvedConfig, path: &Path, query: Option<&str>) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read hits file: {}", path.display()))?;
    let hits: Vec<RetrievalHit> =
        serde_json::from_str(&content).context("Failed to parse hits JSON")?;

    let hits: Vec<RetrievalHit> = match query {
        Some(q) => hits
            .iter()
            .map(|h| score_hit(q, &h.title, &h.url, &h.snippet))
            .collect(),
        None => hits,
    };
    let hits = dedup_by_url(hits);

    let queries = query
        .map(|q| vec![SearchQuery::new(q, "cli")])
        .unwrap_or_default();
    let bundle = build_bundle(queries, &hits);
    let block = build_summary_block(&bundle.summaries, &cfg.budget);

    println!(
        "{}",
        serde_json::to_string_pretty(&bundle).context("Failed to serialize bundle")?
    );
    eprintln!("\n--- Supplementary block ({} chars) ---", block.chars().count());
    eprintln!("{}", block);
    Ok(())
}

fn key_status(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "set"
    } else {
        "not set"
    }
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("slidecast configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Work dir: {}", cfg.work_dir.display());
    println!();
    println!("Models:");
    println!("  LLM: {}", cfg.llm_model);
    println!("  TTS: {}", cfg.tts_model);
    if let Some(base_url) = &cfg.openai_base_url {
        println!("  API: {}", base_url);
    }
    println!();
    println!("API keys:");
    println!("  OPENAI_API_KEY: {}", key_status(&cfg.openai_api_key));
    println!("  TAVILY_API_KEY: {}", key_status(&cfg.tavily_api_key));
    println!();
    println!("Search:");
    println!("  Results per query: {}", cfg.search.results_per_query);
    println!("  Query pause:       {:?}", cfg.search.query_pause);
    println!("  Request timeout:   {:?}", cfg.search.request_timeout);
    println!("  Excluded domains:  {}", cfg.search.excluded_domains.join(", "));
    if let Some(endpoint) = &cfg.search.endpoint {
        println!("  Endpoint:          {}", endpoint);
    }
    println!();
    println!("Media:");
    println!("  ffmpeg:  {}", cfg.media.ffmpeg);
    println!("  ffprobe: {}", cfg.media.ffprobe);
    println!("  Timeout: {:?}", cfg.media.process_timeout);
    println!();
    println!("Prompt budget:");
    println!("  Max sources:           {}", cfg.budget.max_sources);
    println!("  Max chunks per source: {}", cfg.budget.max_chunks_per_source);
    println!("  Max total chars:       {}", cfg.budget.max_total_chars);
    println!("  Chunk length:          {}", cfg.budget.chunk_len);
    println!();
    println!("Safety limits:");
    println!("  Max steps:        {}", cfg.safety.max_steps);
    println!("  Max script chars: {}", cfg.safety.max_script_chars);
    println!();
    println!("Narration:");
    println!("  Tone:     {}", cfg.narration.tone);
    println!("  Voice:    {} ({})", cfg.narration.voice, cfg.narration.voice_name());
    println!("  Style:    {}", cfg.narration.style);
    println!("  Duration: {}s", cfg.narration.target_duration_sec);
    println!("  Speed:    {}", cfg.narration.speed);

    Ok(())
}
