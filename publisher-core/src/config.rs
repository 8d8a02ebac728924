//! Configuration management for Smart Publisher.
//!
//! Configuration is loaded in order of precedence:
//! 1. Defaults
//! 2. Config file (~/.publisher/config.toml)
//! 3. Environment variables
//! 4. CLI flags (handled at CLI layer)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Ordered pool of API keys, used round-robin
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Model to call
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the Generative Language API
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,

    /// Tera template overriding the built-in summary prompt.
    /// Receives `title` and `content`.
    #[serde(default)]
    pub prompt_template: Option<String>,
}

fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_timeout() -> u64 {
    120
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: default_model(),
            api_base: default_gemini_api_base(),
            timeout_secs: default_gemini_timeout(),
            prompt_template: None,
        }
    }
}

/// Telegram delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,

    #[serde(default)]
    pub chat_id: String,

    /// Base URL of the Bot API
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Attempts made on transport failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_telegram_timeout")]
    pub timeout_secs: u64,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_telegram_timeout() -> u64 {
    10
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api_base(),
            max_retries: default_max_retries(),
            timeout_secs: default_telegram_timeout(),
        }
    }
}

/// Summarization pipeline tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Attempts made on transient generation failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff, in seconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,

    /// Cleaned content longer than this (in characters) is truncated
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,

    /// Leading characters kept when truncating
    #[serde(default = "default_excerpt_length")]
    pub intro_length: usize,

    /// Trailing characters kept when truncating
    #[serde(default = "default_excerpt_length")]
    pub conclusion_length: usize,
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    1
}

fn default_max_content_length() -> usize {
    4000
}

fn default_excerpt_length() -> usize {
    2000
}

impl PipelineConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_secs(self.initial_backoff_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_secs: default_initial_backoff(),
            max_content_length: default_max_content_length(),
            intro_length: default_excerpt_length(),
            conclusion_length: default_excerpt_length(),
        }
    }
}

/// Key cooldown configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// How long an exhausted key stays out of rotation
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

fn default_cooldown() -> u64 {
    3600
}

impl QuotaConfig {
    /// Longest accepted cooldown (30 days)
    pub const MAX_COOLDOWN_SECS: u64 = 30 * 24 * 3600;

    /// Cooldown as a chrono duration, clamped to [`Self::MAX_COOLDOWN_SECS`]
    pub fn cooldown(&self) -> chrono::Duration {
        let secs = self.cooldown_secs.min(Self::MAX_COOLDOWN_SECS) as i64;
        chrono::Duration::try_seconds(secs)
            .unwrap_or_else(|| chrono::Duration::seconds(default_cooldown() as i64))
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub quota: QuotaConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Returns the default configuration directory (~/.publisher)
    pub fn publisher_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".publisher"))
    }

    /// Returns the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::publisher_dir().map(|d| d.join("config.toml"))
    }

    /// Load configuration from the default path with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_config_path() {
            Some(path) if path.exists() => Self::read_file(&path)?,
            _ => Config::default(),
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from a specific file with environment overrides
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.gemini.api_keys = normalize_keys(config.gemini.api_keys);
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // GEMINI_API_KEYS is a comma-separated pool
        if let Some(keys) = lookup("GEMINI_API_KEYS") {
            let keys = normalize_keys(keys.split(',').map(str::to_string).collect());
            if !keys.is_empty() {
                self.gemini.api_keys = keys;
            }
        }

        if let Some(model) = lookup("GEMINI_MODEL") {
            self.gemini.model = model;
        }

        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }

        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat_id;
        }

        if let Some(level) = lookup("PUBLISHER_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Check the settings required for summarization
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini.api_keys.is_empty() {
            return Err(ConfigError::ValidationError(
                "no Gemini API keys configured (set GEMINI_API_KEYS or [gemini].api_keys)"
                    .to_string(),
            ));
        }
        if self.pipeline.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_retries must be at least 1".to_string(),
            ));
        }
        let cooldown = self.quota.cooldown_secs;
        if cooldown == 0 || cooldown > QuotaConfig::MAX_COOLDOWN_SECS {
            return Err(ConfigError::ValidationError(format!(
                "quota.cooldown_secs must be between 1 and {}",
                QuotaConfig::MAX_COOLDOWN_SECS
            )));
        }
        Ok(())
    }

    /// Check the settings required for Telegram delivery
    pub fn validate_telegram(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() || self.telegram.chat_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Telegram configuration is incomplete (bot_token and chat_id are required)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Ensure the publisher directory exists
    pub fn ensure_dirs() -> std::io::Result<()> {
        if let Some(dir) = Self::publisher_dir() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn normalize_keys(keys: Vec<String>) -> Vec<String> {
    keys.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
