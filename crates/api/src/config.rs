//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::VendorId;
use thiserror::Error;

/// Signing secret used when `JWT_SECRET` is unset. Only fit for local runs.
pub const DEV_JWT_SECRET: &str = "dev-only-insecure-jwt-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set when DATABASE_URL is configured")]
    MissingJwtSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` - bind address (default: `"0.0.0.0"`)
/// - `PORT` - listen port (default: `3000`)
/// - `RUST_LOG` - tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` - `text` or `json` (default: `text`)
/// - `DATABASE_URL` - PostgreSQL URL; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS` - pool size (default: `5`)
/// - `JWT_SECRET` - HS256 signing secret (default: a development secret,
///   refused by [`Config::validate`] when `DATABASE_URL` is set)
/// - `NOTIFY_MAX_ATTEMPTS` - delivery attempts per notification (default: `3`)
/// - `NOTIFY_RETRY_BACKOFF_MS` - base retry backoff (default: `50`)
/// - `ADMIN_NOTIFICATION_LIMIT` - admin inbox page size (default: `20`)
/// - `KNOWN_VENDOR_IDS` - comma-separated vendor ids; empty accepts any
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub notify_max_attempts: u32,
    pub notify_retry_backoff_ms: u64,
    pub admin_notification_limit: usize,
    pub known_vendor_ids: Vec<VendorId>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT", defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parsed(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            jwt_secret: lookup("JWT_SECRET")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.jwt_secret),
            notify_max_attempts: parsed(
                &lookup,
                "NOTIFY_MAX_ATTEMPTS",
                defaults.notify_max_attempts,
            ),
            notify_retry_backoff_ms: parsed(
                &lookup,
                "NOTIFY_RETRY_BACKOFF_MS",
                defaults.notify_retry_backoff_ms,
            ),
            admin_notification_limit: parsed(
                &lookup,
                "ADMIN_NOTIFICATION_LIMIT",
                defaults.admin_notification_limit,
            ),
            known_vendor_ids: lookup("KNOWN_VENDOR_IDS")
                .map(|raw| parse_vendor_ids(&raw))
                .unwrap_or_default(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Rejects settings that are only acceptable for local runs against the
    /// in-memory store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_some() && self.uses_dev_secret() {
            return Err(ConfigError::MissingJwtSecret);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            notify_max_attempts: 3,
            notify_retry_backoff_ms: 50,
            admin_notification_limit: 20,
            known_vendor_ids: Vec::new(),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_vendor_ids(raw: &str) -> Vec<VendorId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(value = s, "ignoring malformed vendor id in KNOWN_VENDOR_IDS");
                None
            }
        })
        .collect()
}
