use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Default trailing window for a refresh, in calendar days
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_DATABASE_PATH: &str = "stock_data.db";

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Frontend dev servers allowed by default
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173", // Vite dev server
    "http://localhost:3000",
    "http://localhost",
    "http://127.0.0.1:3000",
];

/// Runtime configuration for the service, read from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite database file (`DATABASE_PATH`)
    pub database_path: PathBuf,

    /// HTTP listen port (`PORT`)
    pub port: u16,

    /// Allowed CORS origins (`CORS_ORIGINS`, plus `PRODUCTION_URL` if set)
    pub cors_origins: Vec<String>,

    /// Yahoo Finance API base URL (`YAHOO_BASE_URL`)
    pub provider_base_url: String,

    /// Trailing window fetched on every refresh (`HISTORY_DAYS`)
    pub history_days: u32,

    /// Optional provider request timeout (`PROVIDER_TIMEOUT_SECS`), unset means no timeout
    pub provider_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            port: DEFAULT_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            provider_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            history_days: DEFAULT_HISTORY_DAYS,
            provider_timeout: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(path) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(port) = get("PORT") {
            config.port = parse_number("PORT", &port)?;
        }

        if let Some(origins) = get("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(url) = get("PRODUCTION_URL") {
            if !config.cors_origins.contains(&url) {
                config.cors_origins.push(url);
            }
        }

        if config.cors_origins.iter().any(|o| o == "*") {
            return Err(AppError::Config(
                "CORS origins must be explicit, '*' cannot be combined with credentials".to_string(),
            ));
        }

        if let Some(url) = get("YAHOO_BASE_URL") {
            config.provider_base_url = url;
        }

        if let Some(days) = get("HISTORY_DAYS") {
            let days: u32 = parse_number("HISTORY_DAYS", &days)?;
            if days == 0 {
                return Err(AppError::Config("HISTORY_DAYS must be at least 1".to_string()));
            }
            config.history_days = days;
        }

        if let Some(secs) = get("PROVIDER_TIMEOUT_SECS") {
            let secs: u64 = parse_number("PROVIDER_TIMEOUT_SECS", &secs)?;
            config.provider_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}
