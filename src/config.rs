use crate::inference::DEFAULT_OLLAMA_URL;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Model used when neither `--model` nor `RESUME_SUMMARY_MODEL` is set.
pub const DEFAULT_MODEL: &str = "gpt-oss:20b";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration sourced from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the Ollama runtime serving generations.
    pub ollama_url: String,
    /// Model identifier used unless the CLI overrides it.
    pub model: String,
    /// Optional per-call generation time limit.
    pub request_timeout: Option<Duration>,
    /// Optional cap on concurrent chunk summarizations.
    pub max_workers: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: load_env_optional("RESUME_SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout: load_env_optional("RESUME_SUMMARY_TIMEOUT_SECS")
                .map(|value| {
                    value
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|_| {
                            ConfigError::InvalidValue("RESUME_SUMMARY_TIMEOUT_SECS".into())
                        })
                })
                .transpose()?,
            max_workers: load_env_optional("RESUME_SUMMARY_MAX_WORKERS")
                .map(|value| {
                    value.parse().map_err(|_| {
                        ConfigError::InvalidValue("RESUME_SUMMARY_MAX_WORKERS".to_string())
                    })
                })
                .transpose()?,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Load `.env` (when present) and read configuration from the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    Config::from_env()
}
