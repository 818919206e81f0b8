//! OpenAI adapter: chat completions for content, narration and quiz, and
//! the speech endpoint for narration audio.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::ffmpeg::FfmpegEncoder;
use super::prompts::{
    clean_script, content_prompt, narration_prompt, quiz_prompt, CONTENT_SYSTEM_PROMPT,
    NARRATION_SYSTEM_PROMPT, QUIZ_SYSTEM_PROMPT,
};
use super::{
    ContentRequest, ContentSynthesizer, NarrationRequest, NarrationWriter, QuizGenerator,
    SpeechSynthesizer,
};
use crate::domain::narration::DEFAULT_VOICE;
use crate::domain::{ArtifactRef, NarrationSettings, Slide};
use crate::retrieval::text::truncate_chars;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Images attached to a content request
const MAX_IMAGES: usize = 3;

const CONTENT_TEMPERATURE: f32 = 0.3;
const NARRATION_TEMPERATURE: f32 = 0.7;
const QUIZ_TEMPERATURE: f32 = 0.2;

const EMPTY_SCRIPT_PLACEHOLDER: &str =
    "There is no prepared explanation for this slide. Let's move on and look at the next one together.";

/// Models used by the client
#[derive(Debug, Clone)]
pub struct OpenAiModels {
    pub chat: String,
    pub speech: String,
}

impl Default for OpenAiModels {
    fn default() -> Self {
        Self {
            chat: "gpt-4o-mini".to_string(),
            speech: "gpt-4o-mini-tts".to_string(),
        }
    }
}

/// Client for the OpenAI REST API
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    models: OpenAiModels,
    max_script_chars: usize,
    encoder: FfmpegEncoder,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, models: OpenAiModels, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            models,
            max_script_chars: 4000,
            encoder: FfmpegEncoder::new(),
        })
    }

    /// Use a different API base (proxies, compatible servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_script_chars(mut self, max: usize) -> Self {
        self.max_script_chars = max;
        self
    }

    pub fn with_encoder(mut self, encoder: FfmpegEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Send a chat completion and return the first choice's text
    async fn chat(&self, system: &str, user: Value, temperature: f32) -> Result<String> {
        let body = json!({
            "model": self.models.chat,
            "temperature": temperature,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {}: {}", status, text);
        }

        let json: Value = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .context("Chat completion response had no content")
    }

    /// Request speech for `script` with the given voice, writing mp3 bytes to `path`
    async fn request_speech(&self, script: &str, voice: &str, path: &Path) -> Result<()> {
        let body = json!({
            "model": self.models.speech,
            "voice": voice,
            "input": script,
            "response_format": "mp3",
        });

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Speech request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Speech API error {}: {}", status, text);
        }

        let bytes = response.bytes().await.context("Failed to read speech audio")?;
        tokio::fs::write(path, &bytes)
            .await
            .with_context(|| format!("Failed to write audio: {}", path.display()))?;
        Ok(())
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Slide snapshot first, then embedded images, at most `MAX_IMAGES`
fn image_candidates(slide: &Slide) -> Vec<PathBuf> {
    slide
        .snapshot
        .iter()
        .cloned()
        .chain(slide.image_paths.iter().cloned())
        .take(MAX_IMAGES)
        .collect()
}

/// Encode readable images as data URLs; unreadable ones are skipped
async fn image_parts(slide: &Slide) -> Vec<Value> {
    let mut parts = Vec::new();
    for path in image_candidates(slide) {
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let data = base64::engine::general_purpose::STANDARD.encode(bytes);
                parts.push(json!({
                    "type": "image_url",
                    "image_url": { "url": format!("data:{};base64,{}", mime_for(&path), data) }
                }));
            }
            Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable image"),
        }
    }
    parts
}

/// Script ready for speech: placeholder when empty, truncated when long
pub fn prepare_speech_input(script: &str, max_chars: usize) -> String {
    let script = script.trim();
    if script.is_empty() {
        return EMPTY_SCRIPT_PLACEHOLDER.to_string();
    }
    let truncated = truncate_chars(script, max_chars);
    if truncated.len() < script.len() {
        format!("{} ...", truncated)
    } else {
        script.to_string()
    }
}

#[async_trait]
impl ContentSynthesizer for OpenAiClient {
    async fn synthesize(&self, request: ContentRequest<'_>) -> Result<String> {
        let mut parts = vec![json!({ "type": "text", "text": content_prompt(&request) })];
        parts.extend(image_parts(request.slide).await);

        debug!(slide = request.slide_index + 1, parts = parts.len(), "Synthesizing page content");
        self.chat(CONTENT_SYSTEM_PROMPT, Value::Array(parts), CONTENT_TEMPERATURE)
            .await
    }
}

#[async_trait]
impl NarrationWriter for OpenAiClient {
    async fn write_script(&self, request: NarrationRequest<'_>) -> Result<String> {
        let prompt = narration_prompt(&request);
        let raw = self
            .chat(NARRATION_SYSTEM_PROMPT, Value::String(prompt), NARRATION_TEMPERATURE)
            .await?;
        Ok(clean_script(&raw))
    }
}

#[async_trait]
impl QuizGenerator for OpenAiClient {
    async fn generate_quiz(&self, scripts: &[String]) -> Result<String> {
        self.chat(QUIZ_SYSTEM_PROMPT, Value::String(quiz_prompt(scripts)), QUIZ_TEMPERATURE)
            .await
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    async fn speak(
        &self,
        script: &str,
        slide_index: usize,
        settings: &NarrationSettings,
        work_dir: &Path,
    ) -> Result<ArtifactRef> {
        tokio::fs::create_dir_all(work_dir)
            .await
            .with_context(|| format!("Failed to create work dir: {}", work_dir.display()))?;

        let input = prepare_speech_input(script, self.max_script_chars);
        let voice = settings.voice_name();
        let raw_path = work_dir.join(format!("tts_raw_slide{}.mp3", slide_index));

        info!(slide = slide_index + 1, voice, "Generating narration audio");
        if let Err(e) = self.request_speech(&input, voice, &raw_path).await {
            if voice == DEFAULT_VOICE {
                return Err(e);
            }
            warn!(voice, error = %e, "Speech failed, retrying with {}", DEFAULT_VOICE);
            self.request_speech(&input, DEFAULT_VOICE, &raw_path).await?;
        }

        let speed = settings.clamped_speed();
        if (speed - 1.0).abs() < f32::EPSILON {
            return Ok(ArtifactRef::new(raw_path));
        }

        let tempo_path = work_dir.join(format!("tts_slide{}_{}x.mp3", slide_index, speed));
        match self.encoder.change_tempo(&raw_path, &tempo_path, speed).await {
            Ok(()) => Ok(ArtifactRef::new(tempo_path)),
            Err(e) => {
                warn!(error = %e, "Tempo change failed, using original audio");
                Ok(ArtifactRef::new(raw_path))
            }
        }
    }
}
