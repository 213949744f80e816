// Client configuration
// Environment-driven, with defaults suitable for a local execution service

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_EXECUTION_URL: &str = "http://127.0.0.1:8080/execute";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub const ENV_EXECUTION_URL: &str = "BYTEFORGE_EXECUTION_URL";
pub const ENV_TIMEOUT_SECONDS: &str = "BYTEFORGE_TIMEOUT_SECONDS";
pub const ENV_TOKEN: &str = "BYTEFORGE_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub execution_url: String,
    /// Zero disables the request timeout
    pub timeout_seconds: u64,
    pub token: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            execution_url: DEFAULT_EXECUTION_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            token: None,
        }
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(url) = lookup(ENV_EXECUTION_URL).filter(|u| !u.trim().is_empty()) {
            config.execution_url = url;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECONDS) {
            config.timeout_seconds =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        name: ENV_TIMEOUT_SECONDS,
                        value: raw.clone(),
                    })?;
        }

        config.token = lookup(ENV_TOKEN).filter(|t| !t.is_empty());

        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_seconds))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
