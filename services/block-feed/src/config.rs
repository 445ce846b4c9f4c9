//! Configuration for the Block Feed Service
//!
//! Every setting has a default; the binary overrides them from environment
//! variables via [`FeedConfig::from_env`].

use std::net::SocketAddr;
use std::time::Duration;

use crate::aggregator::DEFAULT_HISTORY_CAPACITY;
use crate::supervisor::BackoffPolicy;

/// Public Base Sepolia flashblock feed.
pub const DEFAULT_FEED_URL: &str = "wss://sepolia.flashblocks.base.org/ws";

/// Default bind address for the republishing server.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8090";

pub const ENV_FEED_URL: &str = "FLASHBLOCKS_WS_URL";
pub const ENV_HISTORY_CAPACITY: &str = "FEED_HISTORY_CAPACITY";
pub const ENV_RECONNECT: &str = "FEED_RECONNECT";
pub const ENV_BACKOFF_BASE_MS: &str = "FEED_BACKOFF_BASE_MS";
pub const ENV_BACKOFF_MAX_MS: &str = "FEED_BACKOFF_MAX_MS";
pub const ENV_MAX_RECONNECTS: &str = "FEED_MAX_RECONNECTS";
pub const ENV_LISTEN_ADDR: &str = "FEED_LISTEN_ADDR";

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Configuration for the feed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Upstream flashblock WebSocket endpoint.
    pub feed_url: String,
    /// Entries kept in each rolling history.
    pub history_capacity: usize,
    /// Reconnect policy; `None` means a lost connection ends the feed.
    pub reconnect: Option<BackoffPolicy>,
    /// Address the republishing server binds to.
    pub listen_addr: SocketAddr,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            reconnect: None,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
        }
    }
}

impl FeedConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = FeedConfig::default();

        if let Some(url) = lookup(ENV_FEED_URL) {
            config.feed_url = url;
        }
        if let Some(value) = lookup(ENV_HISTORY_CAPACITY) {
            config.history_capacity = parse(ENV_HISTORY_CAPACITY, &value)?;
            if config.history_capacity == 0 {
                return Err(invalid(ENV_HISTORY_CAPACITY, &value, "must be at least 1"));
            }
        }
        if let Some(value) = lookup(ENV_LISTEN_ADDR) {
            config.listen_addr = parse(ENV_LISTEN_ADDR, &value)?;
        }

        let reconnect = match lookup(ENV_RECONNECT) {
            Some(value) => parse_bool(ENV_RECONNECT, &value)?,
            None => false,
        };
        if reconnect {
            let mut policy = BackoffPolicy::default();
            if let Some(value) = lookup(ENV_BACKOFF_BASE_MS) {
                policy.base = Duration::from_millis(parse(ENV_BACKOFF_BASE_MS, &value)?);
            }
            if let Some(value) = lookup(ENV_BACKOFF_MAX_MS) {
                policy.max = Duration::from_millis(parse(ENV_BACKOFF_MAX_MS, &value)?);
            }
            if let Some(value) = lookup(ENV_MAX_RECONNECTS) {
                policy.max_attempts = Some(parse(ENV_MAX_RECONNECTS, &value)?);
            }
            if policy.max < policy.base {
                return Err(invalid(ENV_BACKOFF_MAX_MS, &policy.max.as_millis().to_string(), "must not be below the base delay"));
            }
            config.reconnect = Some(policy);
        }

        Ok(config)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value, "expected a boolean")),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
