use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
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
    pub progress_dir: PathBuf,
    pub tutor_stream_url: String,
    pub tutor_api_key: Option<String>,
    pub narration_voice: Option<String>,
    /// How long a browser may take to report that speech finished. `None` waits forever.
    pub speech_timeout: Option<Duration>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let progress_dir = std::env::var("PROGRESS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/progress"));

        let tutor_stream_url = std::env::var("TUTOR_STREAM_URL")
            .map_err(|_| ConfigError::MissingVar("TUTOR_STREAM_URL".to_string()))?;

        let tutor_api_key = std::env::var("TUTOR_API_KEY").ok();
        let narration_voice = std::env::var("NARRATION_VOICE").ok();

        let speech_timeout = match std::env::var("SPEECH_TIMEOUT_MS") {
            Ok(raw) => {
                let ms = raw.parse::<u64>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "SPEECH_TIMEOUT_MS".to_string(),
                        format!("'{}' is not a number of milliseconds", raw),
                    )
                })?;
                Some(Duration::from_millis(ms))
            }
            Err(_) => None,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            progress_dir,
            tutor_stream_url,
            tutor_api_key,
            narration_voice,
            speech_timeout,
            log_level,
        })
    }
}
