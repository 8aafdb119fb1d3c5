//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `probe_timeout_ms` is less than 100ms or exceeds 60 seconds
    /// - `max_bytes` is 0 or exceeds 10MB
    /// - `max_redirects` exceeds 10
    /// - `max_concurrency` is 0 or exceeds 16
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "probe_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.probe_timeout_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "probe_timeout_ms".into(),
                reason: "must not exceed 60 seconds (60000ms)".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 10 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 10MB".into() });
        }

        if self.max_redirects > 10 {
            return Err(ConfigError::Invalid { field: "max_redirects".into(), reason: "must not exceed 10".into() });
        }

        if self.max_concurrency == 0 || self.max_concurrency > 16 {
            return Err(ConfigError::Invalid {
                field: "max_concurrency".into(),
                reason: "must be between 1 and 16".into(),
            });
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.probe_timeout_ms > 8_000 {
            tracing::warn!(
                probe_timeout_ms = self.probe_timeout_ms,
                "probe timeout above 8s; a dead candidate can hold a request for twice this long"
            );
        }

        Ok(())
    }
}
