//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Parsing goes through a key lookup
//! function so it can be exercised without touching the process
//! environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::normalize::{boolean_from_str, parse_positive_int};
use crate::persistence::RetentionLimits;

/// Default webhook history retention.
pub const DEFAULT_WEBHOOK_HISTORY: usize = 20;
/// Upper bound for webhook history retention and reads.
pub const MAX_WEBHOOK_HISTORY: usize = 100;
/// Default indicator history size.
pub const DEFAULT_INDICATOR_HISTORY: usize = 200;
/// Upper bound for indicator history reads.
pub const MAX_INDICATOR_HISTORY: usize = 500;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_TOKEN_HEADER: &str = "X-Zapier-Token";
const DEFAULT_DATABASE_PATH: &str = "data/indicator-values.db";
const DEFAULT_WEBHOOK_LOG_PATH: &str = "data/zapier-log.json";
const DEFAULT_NAMESPACE: &str = "pulse-protocol";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Configuration errors reported at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The listen address could not be parsed.
    #[error("invalid listen address {value:?}: {source}")]
    InvalidListenAddr {
        /// Offending value.
        value: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },

    /// `STORAGE_BACKEND` names no known backend.
    #[error("unknown storage backend {0:?} (expected \"memory\" or \"sqlite\")")]
    UnknownBackend(String),

    /// `LOG_FORMAT` names no known format.
    #[error("unknown log format {0:?} (expected \"pretty\" or \"json\")")]
    UnknownLogFormat(String),
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Bounded in-process history.
    Memory,
    /// SQLite file mirrored into memory.
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnknownLogFormat(s.to_string())),
        }
    }
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to.
    pub listen_addr: SocketAddr,

    /// Shared webhook secret. `None` rejects every webhook call.
    pub webhook_secret: Option<String>,

    /// Header the webhook secret is sent in.
    pub token_header: String,

    /// Webhook records kept, capped at [`MAX_WEBHOOK_HISTORY`].
    pub webhook_history_limit: usize,

    /// Default indicator read size, capped at [`MAX_INDICATOR_HISTORY`].
    pub indicator_history_limit: usize,

    /// Selected storage backend.
    pub storage_backend: StorageBackend,

    /// SQLite database file.
    pub database_path: PathBuf,

    /// Label reported in storage metadata.
    pub storage_namespace: String,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// Maximum accepted request body size.
    pub max_body_bytes: usize,

    /// Webhook log read by the backfill tool.
    pub webhook_log_path: PathBuf,

    /// Log output format.
    pub log_format: LogFormat,

    /// Whether key normalization results are memoized.
    pub normalizer_cache: bool,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("listen_addr", &self.listen_addr)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("token_header", &self.token_header)
            .field("webhook_history_limit", &self.webhook_history_limit)
            .field("indicator_history_limit", &self.indicator_history_limit)
            .field("storage_backend", &self.storage_backend)
            .field("database_path", &self.database_path)
            .field("storage_namespace", &self.storage_namespace)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("webhook_log_path", &self.webhook_log_path)
            .field("log_format", &self.log_format)
            .field("normalizer_cache", &self.normalizer_cache)
            .finish()
    }
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file,
    /// then delegates to [`GatewayConfig::from_lookup`].
    ///
    /// # Errors
    ///
    /// See [`GatewayConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Missing or unparsable numeric values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the listen address, storage backend or
    /// log format is set but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let listen_value = get("LISTEN_ADDR")
            .or_else(|| get("PORT").map(|port| format!("0.0.0.0:{}", port.trim())))
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr =
            listen_value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidListenAddr {
                    value: listen_value.clone(),
                    source,
                })?;

        let webhook_secret = get("ZAPIER_WEBHOOK_SECRET")
            .or_else(|| get("ZAPIER_TOKEN"))
            .map(|secret| secret.trim().to_string());

        let token_header = get("ZAPIER_TOKEN_HEADER")
            .map(|header| header.trim().to_string())
            .unwrap_or_else(|| DEFAULT_TOKEN_HEADER.to_string());

        let limit = |key: &str, default: usize, max: usize| {
            get(key)
                .and_then(|raw| parse_positive_int(&raw))
                .unwrap_or(default)
                .min(max)
        };
        let webhook_history_limit =
            limit("ZAPIER_HISTORY_LIMIT", DEFAULT_WEBHOOK_HISTORY, MAX_WEBHOOK_HISTORY);
        let indicator_history_limit = limit(
            "INDICATOR_HISTORY_LIMIT",
            DEFAULT_INDICATOR_HISTORY,
            MAX_INDICATOR_HISTORY,
        );

        let storage_backend = get("STORAGE_BACKEND")
            .map_or(Ok(StorageBackend::Memory), |raw| raw.parse())?;
        let log_format = get("LOG_FORMAT").map_or(Ok(LogFormat::Pretty), |raw| raw.parse())?;

        let database_path = get("DATABASE_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH), PathBuf::from);
        let webhook_log_path = get("WEBHOOK_LOG_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_WEBHOOK_LOG_PATH), PathBuf::from);
        let storage_namespace = get("STORAGE_NAMESPACE")
            .map(|ns| ns.trim().to_string())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let request_timeout_secs = get("REQUEST_TIMEOUT_SECS")
            .and_then(|raw| parse_positive_int(&raw))
            .map_or(DEFAULT_REQUEST_TIMEOUT_SECS, |secs| secs as u64);
        let max_body_bytes = get("MAX_BODY_BYTES")
            .and_then(|raw| parse_positive_int(&raw))
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        let normalizer_cache = get("NORMALIZER_CACHE")
            .and_then(|raw| boolean_from_str(&raw))
            .unwrap_or(true);

        Ok(Self {
            listen_addr,
            webhook_secret,
            token_header,
            webhook_history_limit,
            indicator_history_limit,
            storage_backend,
            database_path,
            storage_namespace,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_body_bytes,
            webhook_log_path,
            log_format,
            normalizer_cache,
        })
    }

    /// Retention limits derived from the history settings.
    #[must_use]
    pub const fn retention(&self) -> RetentionLimits {
        RetentionLimits {
            webhook: self.webhook_history_limit,
            indicator: self.indicator_history_limit,
        }
    }
}
