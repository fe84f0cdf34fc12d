//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use library_core::lending::DEFAULT_LOAN_DAYS;
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

/// Where books, loans and users are persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    /// Process-local; everything is lost on restart.
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub storage: StorageBackend,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub client_url: String,
    pub cookie_secure: bool,
    pub session_ttl_days: i64,
    /// `None` when loans carry no due date.
    pub loan_period_days: Option<i64>,
    pub dev_login_enabled: bool,
    pub bootstrap_admin_email: Option<String>,
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Storage Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3001".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let storage = match lookup("STORAGE")
            .unwrap_or_else(|| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres {
                database_url: lookup("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
            },
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORAGE".to_string(),
                    format!("'{}' is not one of postgres, memory", other),
                ))
            }
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let openai_model = lookup("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        // --- Load HTTP and Session Settings ---
        let client_url = lookup("CLIENT_URL").unwrap_or_else(|| "http://localhost:5173".to_string());
        let cookie_secure = parse_bool(&lookup, "COOKIE_SECURE", false)?;
        let session_ttl_days = parse_int(&lookup, "SESSION_TTL_DAYS", 7)?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }

        // --- Load Library Policy Settings ---
        let loan_period_days = match parse_int(&lookup, "LOAN_PERIOD_DAYS", DEFAULT_LOAN_DAYS)? {
            0 => None,
            days if days > 0 => Some(days),
            _ => {
                return Err(ConfigError::InvalidValue(
                    "LOAN_PERIOD_DAYS".to_string(),
                    "must not be negative".to_string(),
                ))
            }
        };
        let dev_login_enabled = parse_bool(&lookup, "DEV_LOGIN_ENABLED", false)?;
        let bootstrap_admin_email = lookup("BOOTSTRAP_ADMIN_EMAIL").filter(|e| !e.trim().is_empty());

        Ok(Self {
            bind_address,
            storage,
            log_level,
            openai_api_key,
            openai_model,
            client_url,
            cookie_secure,
            session_ttl_days,
            loan_period_days,
            dev_login_enabled,
            bootstrap_admin_email,
        })
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(v) => match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("'{}' is not a boolean", other),
            )),
        },
    }
}

fn parse_int<F>(lookup: &F, key: &str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<i64>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
