//! Bus configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use event_bus::BusConfig;
//!
//! let config = BusConfig::default().with_max_future_skew_secs(60);
//! config.validate()?;
//! ```

use event_types::{CONTENT_TYPE_JSON, DEFAULT_MAX_FUTURE_SKEW_SECS};
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max future skew must not be negative: {0}")]
    NegativeSkew(i64),

    #[error("content type must not be empty")]
    EmptyContentType,

    #[error("max future skew is not a whole number of seconds: {0:?}")]
    InvalidSkew(String),
}

/// Codec and adapter settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Seconds an event may be stamped ahead of the receiver's clock
    pub max_future_skew_secs: i64,
    /// Content type declared on publish and required (as prefix) on receipt
    pub content_type: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_future_skew_secs: DEFAULT_MAX_FUTURE_SKEW_SECS,
            content_type: CONTENT_TYPE_JSON.to_string(),
        }
    }
}

impl BusConfig {
    /// Create configuration from environment variables.
    ///
    /// - `EVENT_BUS_MAX_FUTURE_SKEW_SECS` (default: 300)
    /// - `EVENT_BUS_CONTENT_TYPE` (default: application/json)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_future_skew_secs = match env::var("EVENT_BUS_MAX_FUTURE_SKEW_SECS") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidSkew(v.clone()))?,
            Err(_) => defaults.max_future_skew_secs,
        };

        let config = Self {
            max_future_skew_secs,
            content_type: env::var("EVENT_BUS_CONTENT_TYPE")
                .map(|v| v.trim().to_lowercase())
                .unwrap_or(defaults.content_type),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_future_skew_secs < 0 {
            return Err(ConfigError::NegativeSkew(self.max_future_skew_secs));
        }
        if self.content_type.trim().is_empty() {
            return Err(ConfigError::EmptyContentType);
        }
        Ok(())
    }

    /// Builder-style method to set the allowed clock skew
    #[must_use]
    pub fn with_max_future_skew_secs(mut self, secs: i64) -> Self {
        self.max_future_skew_secs = secs;
        self
    }

    /// Builder-style method to set the content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Whether a delivered content type is acceptable (case-insensitive prefix).
    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        content_type
            .trim()
            .to_lowercase()
            .starts_with(&self.content_type.trim().to_lowercase())
    }
}
