use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub google: GoogleConfig,
    pub openai: OpenAIConfig,
    pub elevenlabs: ElevenLabsConfig,
    pub search: SearchConfig,
    pub speech: SpeechConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Where uploads are spooled; the system temp directory when unset
    pub upload_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 25 * 1024 * 1024,
            upload_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "strokecare_backend=debug,tower_http=debug".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub api_key: Option<String>,
    pub geocode_url: String,
    pub places_base_url: String,
    pub search_radius_meters: f64,
    pub max_result_count: u32,
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            geocode_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            places_base_url: "https://places.googleapis.com".to_string(),
            search_radius_meters: 40000.0,
            max_result_count: 20,
            timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            transcription_model: "whisper-1".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Voice settings forwarded as-is to the text-to-speech endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.4,
            similarity_boost: 0.85,
            style: 0.6,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_voice_id: String,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
    pub tts_timeout_secs: u64,
    pub clone_timeout_secs: u64,
    pub delete_timeout_secs: u64,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            default_voice_id: "29vD33N1CtxCmqQRPOHJ".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            voice_settings: VoiceSettings::default(),
            tts_timeout_secs: 15,
            clone_timeout_secs: 120,
            delete_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Batch relevance analysis through the chat model
    Ai,
    /// Keyword, rating and distance arithmetic only
    Heuristic,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Ai => "ai",
            ScoringMode::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub worker_pool_size: usize,
    pub fanout_timeout_secs: u64,
    pub max_candidates: usize,
    pub max_distance_miles: f64,
    pub nearby_miles: f64,
    pub nearby_bonus: u32,
    pub default_ai_score: u32,
    pub scoring: ScoringMode,
    /// In heuristic mode, ask the model to describe each ranked facility when a key is set
    pub facility_insights: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 10,
            fanout_timeout_secs: 30,
            max_candidates: 15,
            max_distance_miles: 50.0,
            nearby_miles: 5.0,
            nearby_bonus: 10,
            default_ai_score: 70,
            scoring: ScoringMode::Ai,
            facility_insights: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub min_clone_bytes: u64,
    pub max_clone_bytes: u64,
    pub min_clone_seconds: f64,
    pub long_clone_seconds: f64,
    pub overedit_threshold: f64,
    pub warmup: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            min_clone_bytes: 10_000,
            max_clone_bytes: 25 * 1024 * 1024,
            min_clone_seconds: 5.0,
            long_clone_seconds: 300.0,
            overedit_threshold: 0.7,
            warmup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff_ms: 250,
            max_backoff_ms: 2000,
        }
    }
}

impl Config {
    /// Load configuration from a YAML or JSON file, expanding `${VAR}` references
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(Error::Config(format!("Configuration file not found: {}", path)));
        }

        let content = fs::read_to_string(path)?;
        let content = substitute_env_vars(content.trim_start_matches('\u{feff}'));

        let path_lower = path.to_lowercase();
        let config = if path_lower.ends_with(".json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path, e)))?
        };
        Ok(config)
    }

    /// Environment wins over the file for secrets and the listen address
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GOOGLE_MAPS_API_KEY") {
            self.google.api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(key) = non_empty("ELEVENLABS_API_KEY") {
            self.elevenlabs.api_key = Some(key);
        }
        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Candidate config files, in lookup order
    pub fn candidate_paths() -> Vec<String> {
        vec![
            std::env::var("CONFIG_PATH").ok(),
            Some("conf.yaml".to_string()),
            Some("conf.json".to_string()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Replace environment variables: ${VAR_NAME}
fn substitute_env_vars(content: &str) -> String {
    let pattern = Regex::new(r"\$\{(\w+)\}").expect("valid env pattern");
    pattern
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
