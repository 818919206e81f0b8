//! Narration preferences chosen by the user for a run.

use serde::{Deserialize, Serialize};

/// Voices the speech endpoint accepts
pub const SUPPORTED_VOICES: &[&str] = &["nova", "alloy", "shimmer", "onyx", "fable", "verse", "coral"];

pub const DEFAULT_VOICE: &str = "nova";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationSettings {
    /// Speaking tone, e.g. "friendly and clear"
    #[serde(default = "default_tone")]
    pub tone: String,

    /// Voice preset; the voice name is the part after the last '-'
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Delivery style, e.g. "examples and key points"
    #[serde(default = "default_style")]
    pub style: String,

    /// Target narration length per slide in seconds
    #[serde(default = "default_target_duration")]
    pub target_duration_sec: u32,

    /// Playback speed multiplier
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Silence added after the narration in each clip
    #[serde(default = "default_padding")]
    pub padding_sec: f32,
}

fn default_tone() -> String {
    "friendly and clear lecture tone".to_string()
}
fn default_voice() -> String {
    "explainer -nova".to_string()
}
fn default_style() -> String {
    "examples and key points".to_string()
}
fn default_target_duration() -> u32 {
    60
}
fn default_speed() -> f32 {
    1.0
}
fn default_padding() -> f32 {
    1.5
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            tone: default_tone(),
            voice: default_voice(),
            style: default_style(),
            target_duration_sec: default_target_duration(),
            speed: default_speed(),
            padding_sec: default_padding(),
        }
    }
}

impl NarrationSettings {
    /// Voice name from the preset, falling back to the default voice
    pub fn voice_name(&self) -> &str {
        let name = self.voice.rsplit('-').next().unwrap_or("").trim();
        if SUPPORTED_VOICES.contains(&name) {
            name
        } else {
            DEFAULT_VOICE
        }
    }

    /// Speed clamped to the range the audio filter handles well
    pub fn clamped_speed(&self) -> f32 {
        if self.speed.is_finite() {
            self.speed.clamp(0.5, 2.0)
        } else {
            1.0
        }
    }

    /// Length guidance for the script: (min chars, max chars, min sentences, max sentences)
    pub fn length_guide(&self) -> (u32, u32, u32, u32) {
        let secs = self.target_duration_sec;
        let sent_min = (secs / 15).max(4);
        let sent_max = (secs / 10).max(sent_min + 2);
        (secs * 6, secs * 8, sent_min, sent_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_name_from_preset() {
        let mut settings = NarrationSettings {
            voice: "tech seminar -onyx".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.voice_name(), "onyx");

        settings.voice = "robot".to_string();
        assert_eq!(settings.voice_name(), "nova");
    }

    #[test]
    fn test_speed_clamped() {
        let settings = NarrationSettings {
            speed: 3.5,
            ..Default::default()
        };
        assert_eq!(settings.clamped_speed(), 2.0);
    }

    #[test]
    fn test_length_guide() {
        let settings = NarrationSettings::default();
        assert_eq!(settings.length_guide(), (360, 480, 4, 6));
    }
}
