//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. The three hosted collaborators are
//! each optional: when a URL is absent the in-process development adapter is
//! used instead.

use std::net::SocketAddr;
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
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub cors_origin: String,

    /// Base URL of the hosted realtime document database; unset means the
    /// in-process store.
    pub docstore_url: Option<String>,

    /// Base URL of the hosted identity provider; unset means the local
    /// credential store.
    pub identity_url: Option<String>,
    pub identity_api_key: Option<String>,

    /// Base URL of the media host's upload API; unset means local files.
    pub media_upload_url: Option<String>,
    pub media_upload_preset: String,
    pub media_dir: PathBuf,
    pub media_public_base: String,
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

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        // --- Load Collaborator Endpoints (all optional) ---
        let docstore_url = std::env::var("DOCSTORE_URL").ok();
        let identity_url = std::env::var("IDENTITY_URL").ok();
        let identity_api_key = std::env::var("IDENTITY_API_KEY").ok();

        if identity_url.is_some() && identity_api_key.is_none() {
            return Err(ConfigError::MissingVar("IDENTITY_API_KEY".to_string()));
        }

        // --- Load Media Host Settings ---
        let media_upload_url = std::env::var("MEDIA_UPLOAD_URL").ok();
        let media_upload_preset =
            std::env::var("MEDIA_UPLOAD_PRESET").unwrap_or_else(|_| "Samvaad".to_string());
        let media_dir = std::env::var("MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./media"));
        let media_public_base = std::env::var("MEDIA_PUBLIC_BASE")
            .unwrap_or_else(|_| format!("http://{}/files", bind_address_str));

        Ok(Self {
            bind_address,
            log_level,
            cors_origin,
            docstore_url,
            identity_url,
            identity_api_key,
            media_upload_url,
            media_upload_preset,
            media_dir,
            media_public_base,
        })
    }
}
