//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
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
    /// Identifier of the backing spreadsheet.
    pub spreadsheet_id: String,
    /// Hosted domain required of every login; `None` disables the check.
    pub allowed_domain: Option<String>,
    /// Base URL of the spreadsheet API (overridable for local testing).
    pub sheets_api_base: String,
    /// OAuth userinfo endpoint.
    pub userinfo_url: String,
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

        let spreadsheet_id = std::env::var("SPREADSHEET_ID")
            .map_err(|_| ConfigError::MissingVar("SPREADSHEET_ID".to_string()))?;

        let allowed_domain = std::env::var("ALLOWED_DOMAIN")
            .ok()
            .filter(|domain| !domain.trim().is_empty());

        let sheets_api_base = std::env::var("SHEETS_API_BASE")
            .unwrap_or_else(|_| "https://sheets.googleapis.com".to_string());

        let userinfo_url = std::env::var("USERINFO_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v3/userinfo".to_string());

        Ok(Self {
            bind_address,
            log_level,
            spreadsheet_id,
            allowed_domain,
            sheets_api_base,
            userinfo_url,
        })
    }
}
