//! ffmpeg adapter for clip rendering and concatenation.
//!
//! Runs the `ffmpeg` and `ffprobe` binaries as subprocesses. Each slide clip
//! is a still image looped over its narration, letterboxed to 1920x1080.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::MediaEncoder;
use crate::domain::{clip_file_name, ArtifactRef};

/// Duration assumed when ffprobe cannot read the audio
pub const DEFAULT_AUDIO_SECS: f64 = 5.0;

/// Shortest clip ever rendered
pub const MIN_CLIP_SECS: f64 = 0.5;

const LETTERBOX_FILTER: &str =
    "scale=1920:1080:force_original_aspect_ratio=decrease,pad=1920:1080:(ow-iw)/2:(oh-ih)/2:color=black";

/// Clip encoder backed by ffmpeg subprocesses
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg_path: String,
    ffprobe_path: String,
    process_timeout: Duration,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            process_timeout: Duration::from_secs(600),
        }
    }

    /// Use custom binary locations
    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg.into(),
            ffprobe_path: ffprobe.into(),
            ..Self::new()
        }
    }

    pub fn with_timeout(mut self, process_timeout: Duration) -> Self {
        self.process_timeout = process_timeout;
        self
    }

    /// Run ffmpeg with the given arguments, failing on non-zero exit
    async fn run_ffmpeg(&self, args: &[String]) -> Result<()> {
        debug!(args = ?args, "Running ffmpeg");
        let child = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.ffmpeg_path))?;

        let output = timeout(self.process_timeout, child.wait_with_output())
            .await
            .with_context(|| format!("ffmpeg timed out after {:?}", self.process_timeout))?
            .context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "ffmpeg failed with exit code {}: {}",
                output.status.code().unwrap_or(-1),
                last_lines(&stderr, 5)
            );
        }
        Ok(())
    }

    /// Media duration in seconds as reported by ffprobe
    pub async fn probe_duration(&self, media: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(media)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffprobe_path))?;

        if !output.status.success() {
            anyhow::bail!("ffprobe failed for {}", media.display());
        }

        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<f64>()
            .with_context(|| format!("Unparseable ffprobe duration: {:?}", text.trim()))
    }

    /// Re-time an audio file with the `atempo` filter
    pub async fn change_tempo(&self, input: &Path, output: &Path, speed: f32) -> Result<()> {
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-filter:a".to_string(),
            format!("atempo={}", speed),
            output.display().to_string(),
        ];
        self.run_ffmpeg(&args).await
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

/// Clip length for a narration of `audio_secs` plus padding
pub fn clip_duration(audio_secs: f64, padding_sec: f32) -> f64 {
    (audio_secs + f64::from(padding_sec)).max(MIN_CLIP_SECS)
}

/// Arguments rendering a looped still image over an audio track
pub fn clip_args(image: &Path, audio: &Path, duration_secs: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-i".to_string(),
        image.display().to_string(),
        "-i".to_string(),
        audio.display().to_string(),
        "-t".to_string(),
        format!("{:.3}", duration_secs),
        "-vf".to_string(),
        LETTERBOX_FILTER.to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        output.display().to_string(),
    ]
}

/// Arguments concatenating clips with the concat filter
pub fn concat_args(clips: &[ArtifactRef], output: &Path) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    let mut filter = String::new();
    for (i, clip) in clips.iter().enumerate() {
        args.push("-i".to_string());
        args.push(clip.path().display().to_string());
        filter.push_str(&format!("[{i}:v][{i}:a]"));
    }
    filter.push_str(&format!("concat=n={}:v=1:a=1[outv][outa]", clips.len()));

    args.extend(
        [
            "-filter_complex",
            filter.as_str(),
            "-map",
            "[outv]",
            "-map",
            "[outa]",
            "-c:v",
            "libx264",
            "-c:a",
            "aac",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(output.display().to_string());
    args
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn render_clip(
        &self,
        image: &Path,
        audio: &ArtifactRef,
        slide_index: usize,
        padding_sec: f32,
        work_dir: &Path,
    ) -> Result<ArtifactRef> {
        if !image.exists() {
            anyhow::bail!("Slide image not found: {}", image.display());
        }
        if !audio.path().exists() {
            anyhow::bail!("Narration audio not found: {}", audio);
        }
        tokio::fs::create_dir_all(work_dir)
            .await
            .with_context(|| format!("Failed to create work dir: {}", work_dir.display()))?;

        let audio_secs = match self.probe_duration(audio.path()).await {
            Ok(secs) => secs,
            Err(e) => {
                warn!(error = %e, "ffprobe failed, assuming {}s", DEFAULT_AUDIO_SECS);
                DEFAULT_AUDIO_SECS
            }
        };

        let output: PathBuf = work_dir.join(clip_file_name(slide_index));
        let args = clip_args(image, audio.path(), clip_duration(audio_secs, padding_sec), &output);

        info!(slide = slide_index + 1, "Rendering clip");
        if let Err(first) = self.run_ffmpeg(&args).await {
            warn!(slide = slide_index + 1, error = %first, "Clip render failed, retrying once");
            self.run_ffmpeg(&args)
                .await
                .with_context(|| format!("Clip render failed twice for slide {}", slide_index + 1))?;
        }

        Ok(ArtifactRef::new(output))
    }

    async fn concat(&self, clips: &[ArtifactRef], output: &Path) -> Result<ArtifactRef> {
        if clips.is_empty() {
            anyhow::bail!("No clips to concatenate");
        }
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        info!(clips = clips.len(), output = %output.display(), "Concatenating clips");
        self.run_ffmpeg(&concat_args(clips, output)).await?;
        Ok(ArtifactRef::new(output))
    }
}
