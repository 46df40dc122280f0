use gemini_realtime::{DEFAULT_API_VERSION, DEFAULT_BASE_URL};
use photon_core::{DEFAULT_MODEL, DEFAULT_THINKING_BUDGET};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub google_api_key: String,
    pub model: String,
    pub api_version: String,
    pub live_url: String,
    pub thinking_budget: u32,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let google_api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("GOOGLE_API_KEY".to_string()))?;

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_version =
            std::env::var("GEMINI_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());
        let live_url =
            std::env::var("GEMINI_LIVE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let thinking_budget = match std::env::var("THINKING_BUDGET") {
            Ok(value) => value.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("THINKING_BUDGET".to_string(), e.to_string())
            })?,
            Err(_) => DEFAULT_THINKING_BUDGET,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        Ok(Self {
            bind_address,
            google_api_key,
            model,
            api_version,
            live_url,
            thinking_budget,
            log_level,
            prompts_path,
        })
    }
}
