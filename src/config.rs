//! Configuration management for Confide
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files and environment variables.

use crate::error::{ConfideError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Confide
///
/// This structure holds all configuration needed for the chat companion,
/// including provider settings, session behavior, and storage locations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Provider configuration (OpenAI-compatible endpoint)
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Session behavior configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Provider configuration
///
/// Specifies which model provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI-compatible endpoint configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL for the chat-completions API
    ///
    /// When pointed at a local mock server this allows tests to exercise
    /// the full HTTP path without real credentials.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model to use for completions
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Session behavior configuration
///
/// Controls sampling temperatures for the three kinds of model calls,
/// response length, timeouts, and the companion's opening behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Temperature for conversational replies
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,

    /// Temperature for memory extraction (kept low: factual task)
    #[serde(default = "default_extraction_temperature")]
    pub extraction_temperature: f32,

    /// Temperature for end-of-conversation synthesis (kept high to avoid
    /// templated phrasing across conversations)
    #[serde(default = "default_synthesis_temperature")]
    pub synthesis_temperature: f32,

    /// Maximum tokens per assistant reply (keeps responses brief)
    #[serde(default = "default_max_response_tokens")]
    pub max_response_tokens: u32,

    /// Timeout for synthesis, extraction, and sentiment calls (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Style hint passed to the synthesizer
    #[serde(default = "default_tone")]
    pub tone: String,

    /// Assistant greeting seeded into every new conversation
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_chat_temperature() -> f32 {
    0.8
}

fn default_extraction_temperature() -> f32 {
    0.3
}

fn default_synthesis_temperature() -> f32 {
    0.8
}

fn default_max_response_tokens() -> u32 {
    200
}

fn default_request_timeout() -> u64 {
    45
}

fn default_tone() -> String {
    "warm and supportive".to_string()
}

fn default_greeting() -> String {
    "What's on your mind?".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chat_temperature: default_chat_temperature(),
            extraction_temperature: default_extraction_temperature(),
            synthesis_temperature: default_synthesis_temperature(),
            max_response_tokens: default_max_response_tokens(),
            request_timeout_seconds: default_request_timeout(),
            tone: default_tone(),
            greeting: default_greeting(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the data directory
    ///
    /// When unset the platform data directory is used. The
    /// `CONFIDE_DATA_DIR` environment variable takes precedence over both.
    #[serde(default)]
    pub data_dir: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// A missing file yields the default configuration; a present but
    /// malformed file is an error.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// Returns the loaded configuration or an error
    ///
    /// # Examples
    ///
    /// ```
    /// use confide::config::Config;
    ///
    /// let config = Config::load("does/not/exist.yaml").unwrap();
    /// assert_eq!(config.provider.provider_type, "openai");
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfideError::Config(format!("Failed to read config file: {}", e)))?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| ConfideError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Returns
    ///
    /// Returns Ok(()) if the configuration is valid
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Config` if any setting is out of range
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type != "openai" {
            return Err(ConfideError::Config(format!(
                "Unknown provider type: {}",
                self.provider.provider_type
            ))
            .into());
        }

        for (name, value) in [
            ("chat_temperature", self.session.chat_temperature),
            ("extraction_temperature", self.session.extraction_temperature),
            ("synthesis_temperature", self.session.synthesis_temperature),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfideError::Config(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                ))
                .into());
            }
        }

        if self.session.request_timeout_seconds == 0 {
            return Err(ConfideError::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.max_response_tokens == 0 {
            return Err(ConfideError::Config(
                "max_response_tokens must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
