use std::path::PathBuf;
use tracing::Level;
use uuid::Uuid;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the dialogue backend.
    pub backend_url: String,
    /// Stable identifier sent with every gateway request. Generated per run
    /// when not configured.
    pub user_id: String,
    /// Optional subject the chat conversation is grounded to.
    pub subject_id: Option<String>,
    /// Directory holding the persisted transcript.
    pub data_dir: PathBuf,
    /// Per-request timeout for gateway calls, in seconds.
    pub request_timeout_secs: u64,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables, with defaults for
    /// everything, so the client starts without any setup.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let backend_url = std::env::var("LOGIBOTS_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:5005".to_string());

        let user_id = std::env::var("LOGIBOTS_USER_ID")
            .unwrap_or_else(|_| Uuid::new_v4().to_string());

        let subject_id = std::env::var("LOGIBOTS_SUBJECT_ID").ok();

        let data_dir = std::env::var("LOGIBOTS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let timeout_str =
            std::env::var("LOGIBOTS_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let request_timeout_secs = timeout_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "LOGIBOTS_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a number of seconds", timeout_str),
            )
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            backend_url,
            user_id,
            subject_id,
            data_dir,
            request_timeout_secs,
            log_level,
        })
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".logibots")
}
