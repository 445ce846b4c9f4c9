//! Client configuration
//!
//! `KRT_API_URL` overrides the ranking service base URL at runtime.

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://base-flash-speed-challenge-api.tokenpage.xyz";
pub const DEFAULT_NAME_CACHE_SIZE: usize = 256;

pub const ENV_API_URL: &str = "KRT_API_URL";
pub const ENV_NAME_CACHE_SIZE: &str = "CHALLENGE_NAME_CACHE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Ranking service base URL, without trailing slash.
    pub base_url: String,
    /// Capacity of the address → name cache.
    pub name_cache_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            name_cache_size: DEFAULT_NAME_CACHE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();

        // An empty override falls back to the default, like an unset one
        if let Some(url) = lookup(ENV_API_URL).filter(|url| !url.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(value) = lookup(ENV_NAME_CACHE_SIZE) {
            config.name_cache_size = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: ENV_NAME_CACHE_SIZE,
                    value,
                })?;
        }

        Ok(config)
    }
}
