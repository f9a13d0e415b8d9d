//! Client configuration loaded from TOML.
//!
//! ```toml
//! base_uri = "http://localhost:3000"
//! timeout_ms = 5000
//! decode_content = true
//!
//! [default_headers]
//! user-agent = "wire-core"
//!
//! [retry]
//! attempts = 3
//! statuses = [500, 502, 503, 504]
//!
//! [cache]
//! validator = "last-modified"
//! ```
//!
//! Omitting `[retry]` or `[cache]` leaves that wire out of the chain.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::wires::retry::{DEFAULT_ATTEMPTS, DEFAULT_RETRY_STATUSES};
use crate::wires::Validator;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub base_uri: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default = "default_decode_content")]
    pub decode_content: bool,
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

fn default_decode_content() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_statuses")]
    pub statuses: Vec<u16>,
    #[serde(default)]
    pub backoff_base_ms: u64,
    #[serde(default)]
    pub backoff_max_ms: u64,
}

fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

fn default_statuses() -> Vec<u16> {
    DEFAULT_RETRY_STATUSES.to_vec()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            statuses: default_statuses(),
            backoff_base_ms: 0,
            backoff_max_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub validator: Validator,
}

impl ClientConfig {
    /// Minimal config: no retry, no cache, content decoding on.
    pub fn new(base_uri: &str) -> Self {
        Self {
            base_uri: base_uri.to_string(),
            timeout_ms: None,
            decode_content: true,
            default_headers: BTreeMap::new(),
            retry: None,
            cache: None,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Collects every problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match Url::parse(&self.base_uri) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!("base_uri: unsupported scheme {}", url.scheme())),
            Err(e) => errors.push(format!("base_uri: {e}")),
        }

        if let Some(retry) = &self.retry {
            if retry.attempts == 0 {
                errors.push("retry.attempts: must be at least 1".to_string());
            }
            for status in &retry.statuses {
                if !(100..=599).contains(status) {
                    errors.push(format!("retry.statuses: {status} is not an HTTP status"));
                }
            }
            if retry.backoff_max_ms < retry.backoff_base_ms {
                errors.push("retry.backoff_max_ms: smaller than backoff_base_ms".to_string());
            }
        }

        if self.timeout_ms == Some(0) {
            errors.push("timeout_ms: must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
