//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the REST API, e.g. `http://localhost:3000`.
    pub api_base_url: String,
    /// URL of the real-time chat endpoint, e.g. `ws://localhost:3000/ws`.
    pub socket_url: String,
    /// Directory holding the persisted credential slots.
    pub state_dir: PathBuf,
    pub log_level: Level,
    /// Optional non-interactive login credentials for the terminal client.
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let api_base_url = api_base_url.trim_end_matches('/').to_string();
        if api_base_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "API_BASE_URL".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let socket_url =
            std::env::var("SOCKET_URL").unwrap_or_else(|_| "ws://localhost:3000/ws".to_string());
        if !socket_url.starts_with("ws://") && !socket_url.starts_with("wss://") {
            return Err(ConfigError::InvalidValue(
                "SOCKET_URL".to_string(),
                format!("'{}' is not a ws:// or wss:// URL", socket_url),
            ));
        }

        let state_dir = std::env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.telehealth-client"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Optional login credentials for the terminal client ---
        let email = std::env::var("TELEHEALTH_EMAIL").ok();
        let password = std::env::var("TELEHEALTH_PASSWORD").ok();

        Ok(Self {
            api_base_url,
            socket_url,
            state_dir,
            log_level,
            email,
            password,
        })
    }
}
