//! Configuration for slidecast.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SLIDECAST_HOME, SLIDECAST_WORK_DIR, OPENAI_API_KEY,
//!    OPENAI_BASE_URL, TAVILY_API_KEY, SLIDECAST_LLM_MODEL, SLIDECAST_TTS_MODEL,
//!    SLIDECAST_FFMPEG, SLIDECAST_FFPROBE), including those loaded from a
//!    `.env` file
//! 2. Config file (.slidecast/config.yaml)
//! 3. Defaults (~/.slidecast)
//!
//! Config file discovery:
//! - Searches current directory and parents for .slidecast/config.yaml
//! - Relative paths in the config file resolve against the .slidecast/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::SafetyLimits;
use crate::domain::NarrationSettings;
use crate::retrieval::{PromptBudget, DEFAULT_EXCLUDED_DOMAINS};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub budget: Option<PromptBudget>,
    #[serde(default)]
    pub safety: Option<SafetyLimits>,
    #[serde(default)]
    pub narration: Option<NarrationSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .slidecast/)
    pub home: Option<String>,
    /// Where audio, clips and the final lecture are written
    pub work_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsConfig {
    pub llm: Option<String>,
    pub tts: Option<String>,
    /// OpenAI-compatible API root
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    pub results_per_query: Option<usize>,
    pub excluded_domains: Option<Vec<String>>,
    pub query_pause_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaConfig {
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Resolved search settings
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub results_per_query: usize,
    pub excluded_domains: Vec<String>,
    pub query_pause: Duration,
    /// Per-request timeout for HTTP collaborators
    pub request_timeout: Duration,
    /// Search API endpoint override
    pub endpoint: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            results_per_query: 4,
            excluded_domains: DEFAULT_EXCLUDED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            query_pause: Duration::from_millis(200),
            request_timeout: Duration::from_secs(120),
            endpoint: None,
        }
    }
}

/// Resolved ffmpeg settings
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSettings {
    pub ffmpeg: String,
    pub ffprobe: String,
    /// Upper bound on a single ffmpeg/ffprobe invocation
    pub process_timeout: Duration,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            process_timeout: Duration::from_secs(600),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to slidecast home
    pub home: PathBuf,
    /// Base directory for run output
    pub work_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub tavily_api_key: Option<String>,
    pub llm_model: String,
    pub tts_model: String,
    pub search: SearchSettings,
    pub media: MediaSettings,
    pub budget: PromptBudget,
    pub safety: SafetyLimits,
    pub narration: NarrationSettings,
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".slidecast").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Combine a parsed config file, an environment lookup and the default home
fn resolve(
    config_file: Option<(PathBuf, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
    default_home: PathBuf,
) -> ResolvedConfig {
    let (config_path, file) = match config_file {
        Some((path, file)) => (Some(path), file),
        None => (None, ConfigFile::default()),
    };
    let config_dir = config_path
        .as_ref()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let home = env("SLIDECAST_HOME")
        .map(PathBuf::from)
        .or_else(|| file.paths.home.as_deref().map(|h| resolve_path(&config_dir, h)))
        .unwrap_or(default_home);

    let work_dir = env("SLIDECAST_WORK_DIR")
        .map(PathBuf::from)
        .or_else(|| file.paths.work_dir.as_deref().map(|w| resolve_path(&config_dir, w)))
        .unwrap_or_else(|| home.join("work"));

    let defaults = SearchSettings::default();
    let search = SearchSettings {
        results_per_query: file.search.results_per_query.unwrap_or(defaults.results_per_query),
        excluded_domains: file.search.excluded_domains.unwrap_or(defaults.excluded_domains),
        query_pause: file
            .search
            .query_pause_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.query_pause),
        request_timeout: file
            .search
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout),
        endpoint: file.search.endpoint,
    };

    let media_defaults = MediaSettings::default();
    let media = MediaSettings {
        ffmpeg: env("SLIDECAST_FFMPEG")
            .or(file.media.ffmpeg)
            .unwrap_or(media_defaults.ffmpeg),
        ffprobe: env("SLIDECAST_FFPROBE")
            .or(file.media.ffprobe)
            .unwrap_or(media_defaults.ffprobe),
        process_timeout: file
            .media
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(media_defaults.process_timeout),
    };

    ResolvedConfig {
        home,
        work_dir,
        config_file: config_path,
        openai_api_key: env("OPENAI_API_KEY").filter(|k| !k.is_empty()),
        openai_base_url: env("OPENAI_BASE_URL")
            .or(file.models.base_url)
            .filter(|u| !u.is_empty()),
        tavily_api_key: env("TAVILY_API_KEY").filter(|k| !k.is_empty()),
        llm_model: env("SLIDECAST_LLM_MODEL")
            .or(file.models.llm)
            .unwrap_or_else(|| "gpt-4o-mini".to_string()),
        tts_model: env("SLIDECAST_TTS_MODEL")
            .or(file.models.tts)
            .unwrap_or_else(|| "gpt-4o-mini-tts".to_string()),
        search,
        media,
        budget: file.budget.unwrap_or_default(),
        safety: file.safety.unwrap_or_default(),
        narration: file.narration.unwrap_or_default(),
    }
}

/// Load configuration from all sources, discovering the config file from `start`
fn load_config_from(start: &Path) -> Result<ResolvedConfig> {
    let _ = dotenvy::dotenv();

    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".slidecast");

    let config_file = match find_config_file(start) {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    Ok(resolve(config_file, |key| std::env::var(key).ok(), default_home))
}

fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, no_env, PathBuf::from("/home/u/.slidecast"));

        assert_eq!(config.home, PathBuf::from("/home/u/.slidecast"));
        assert_eq!(config.work_dir, PathBuf::from("/home/u/.slidecast/work"));
        assert!(config.config_file.is_none());
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.search, SearchSettings::default());
        assert_eq!(config.media, MediaSettings::default());
        assert!(config.openai_base_url.is_none());
        assert_eq!(config.budget, PromptBudget::default());
        assert_eq!(config.safety.max_steps, 200);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".slidecast");
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  work_dir: /tmp/lectures
models:
  llm: gpt-4o
search:
  results_per_query: 6
  excluded_domains: [example.com]
budget:
  max_total_chars: 900
safety:
  max_steps: 40
narration:
  voice: "calm -onyx"
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version.as_deref(), Some("1.0"));

        let config = resolve(Some((config_path.clone(), parsed)), no_env, PathBuf::from("/h"));
        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(config.work_dir, PathBuf::from("/tmp/lectures"));
        assert_eq!(config.llm_model, "gpt-4o");
        assert_eq!(config.tts_model, "gpt-4o-mini-tts");
        assert_eq!(config.search.results_per_query, 6);
        assert_eq!(config.search.excluded_domains, vec!["example.com".to_string()]);
        assert_eq!(config.budget.max_total_chars, 900);
        assert_eq!(config.budget.chunk_len, 220);
        assert_eq!(config.safety.max_steps, 40);
        assert_eq!(config.narration.voice_name(), "onyx");
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("SLIDECAST_HOME", "/env/home"),
            ("SLIDECAST_LLM_MODEL", "env-model"),
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", ""),
            ("SLIDECAST_FFMPEG", "/env/ffmpeg"),
        ]
        .into_iter()
        .collect();
        let file = ConfigFile {
            models: ModelsConfig {
                llm: Some("file-model".to_string()),
                tts: None,
                base_url: Some("https://file.example/v1".to_string()),
            },
            media: MediaConfig {
                ffmpeg: Some("/opt/file/ffmpeg".to_string()),
                ffprobe: None,
                timeout_seconds: Some(30),
            },
            ..Default::default()
        };

        let config = resolve(
            Some((PathBuf::from("/p/.slidecast/config.yaml"), file)),
            |k| env.get(k).map(|v| v.to_string()),
            PathBuf::from("/h"),
        );
        assert_eq!(config.home, PathBuf::from("/env/home"));
        assert_eq!(config.work_dir, PathBuf::from("/env/home/work"));
        assert_eq!(config.llm_model, "env-model");
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert!(config.tavily_api_key.is_none());
        assert_eq!(config.openai_base_url.as_deref(), Some("https://file.example/v1"));
        assert_eq!(config.media.ffmpeg, "/env/ffmpeg");
        assert_eq!(config.media.ffprobe, "ffprobe");
        assert_eq!(config.media.process_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_load_discovers_config_in_parent_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".slidecast");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.yaml"), "search:\n  results_per_query: 9\n").unwrap();

        let nested = temp.path().join("decks").join("week1");
        std::fs::create_dir_all(&nested).unwrap();

        let config = load_config_from(&nested).unwrap();
        assert_eq!(config.config_file, Some(dir.join("config.yaml")));
        assert_eq!(config.search.results_per_query, 9);
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/./subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
