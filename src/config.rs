//! Configuration management for taskmind.
//!
//! Configuration is read from environment variables (a `.env` file in the
//! working directory is loaded first, if present):
//! - `GEMINI_API_KEY` - Optional at startup. Without it every command is answered
//!   with an `unknown` interpretation explaining the configuration problem.
//! - `GEMINI_MODEL` - Optional. Model used for interpretation. Defaults to `gemini-2.0-flash`.
//! - `GEMINI_API_BASE` - Optional. Base URL of the Gemini API.
//! - `LLM_TIMEOUT_SECS` - Optional. Timeout for one interpretation request. Defaults to `30`.
//! - `TASK_STORE_URL` - Optional. Connection string of the task store
//!   (`memory://`, `file://<path>`, `sqlite://<path>`). Defaults to `sqlite://./data/tasks.db`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `CORS_ORIGINS` - Optional. Comma-separated list of allowed origins.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_STORE_URL: &str = "sqlite://./data/tasks.db";
const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost", "http://localhost:3000"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the LLM endpoint used by the command interpreter.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Gemini API key. `None` when unset or blank.
    pub api_key: Option<String>,

    /// Model identifier appended to the endpoint path
    pub model: String,

    /// Base URL, without the `/models/...` suffix
    pub api_base: String,

    /// Timeout applied to the whole request
    pub timeout: Duration,
}

impl LlmConfig {
    /// Returns the API key or `ConfigError::MissingEnvVar`.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// LLM endpoint settings
    pub llm: LlmConfig,

    /// Task store connection string
    pub store_url: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Origins allowed by the CORS layer
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `PORT` or `LLM_TIMEOUT_SECS` cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());

        let api_base = std::env::var("GEMINI_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string());

        let timeout_secs: u64 = std::env::var("LLM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("LLM_TIMEOUT_SECS".to_string(), format!("{}", e))
            })?;

        let store_url =
            std::env::var("TASK_STORE_URL").unwrap_or_else(|_| DEFAULT_STORE_URL.to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let cors_origins = match std::env::var("CORS_ORIGINS") {
            Ok(value) => parse_origins(&value),
            Err(_) => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            llm: LlmConfig {
                api_key,
                model,
                api_base,
                timeout: Duration::from_secs(timeout_secs),
            },
            store_url,
            host,
            port,
            cors_origins,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: Option<String>, store_url: impl Into<String>) -> Self {
        Self {
            llm: LlmConfig {
                api_key,
                ..LlmConfig::default()
            },
            store_url: store_url.into(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.to_string())
        .collect()
}
