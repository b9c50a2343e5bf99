//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Match data API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Region segment of the match URL, e.g. "ap", "eu", "na"
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_platform")]
    pub platform: String,

    #[serde(default = "default_mode")]
    pub mode: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,

    /// How long a fetched match stays fresh in the raw cache
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

fn default_api_base_url() -> String {
    "https://api.henrikdev.xyz".to_string()
}

fn default_region() -> String {
    "ap".to_string()
}

fn default_platform() -> String {
    "pc".to_string()
}

fn default_mode() -> String {
    "competitive".to_string()
}

fn default_api_key_env() -> String {
    "HENRIK_API_KEY".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    600
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            region: default_region(),
            platform: default_platform(),
            mode: default_mode(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_api_timeout(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

/// Older setups export the key under this name.
pub const LEGACY_API_KEY_ENV: &str = "RIOT_API_KEY";

impl ApiConfig {
    /// API key from the configured environment variable, falling back to
    /// `RIOT_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.resolve_api_key(|name| std::env::var(name).ok())
    }

    /// Resolve the key through `lookup`; blank values count as unset.
    pub fn resolve_api_key<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        [self.api_key_env.as_str(), LEGACY_API_KEY_ENV]
            .into_iter()
            .filter_map(|name| lookup(name))
            .find(|k| !k.trim().is_empty())
    }
}

/// AI backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Backend type: "ollama" or "anthropic"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base URL for the AI service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Max retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Environment variable holding the remote backend key
    #[serde(default = "default_ai_key_env")]
    pub api_key_env: String,
}

fn default_backend() -> String {
    "ollama".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_ai_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            api_key_env: default_ai_key_env(),
        }
    }
}

/// Coaching request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub coach: CoachConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            api: ApiConfig::default(),
            ai: AiConfig::default(),
            coach: CoachConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            info!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "AI timeout must be greater than 0".to_string(),
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "API timeout must be greater than 0".to_string(),
            ));
        }

        if self.api.region.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "API region must not be empty".to_string(),
            ));
        }

        if self.coach.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "Coach max_tokens must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.coach.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Coach temperature {} out of range 0.0..=2.0",
                self.coach.temperature
            )));
        }

        Ok(())
    }
}
