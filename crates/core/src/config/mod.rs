//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SRCWATCH_*)
//! 2. TOML config file (if SRCWATCH_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The stability allow-lists are not configuration; they live as constant
//! tables in [`crate::stability`].

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SRCWATCH_*)
/// 2. TOML config file (if SRCWATCH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite source cache database.
    ///
    /// Set via SRCWATCH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string sent with every probe.
    ///
    /// Set via SRCWATCH_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Deadline for a single HTTP attempt in milliseconds.
    ///
    /// The HEAD attempt and the fallback GET each get their own deadline.
    /// Set via SRCWATCH_PROBE_TIMEOUT_MS environment variable.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Maximum body bytes read from a probed page.
    ///
    /// Set via SRCWATCH_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of redirects followed per attempt.
    ///
    /// Set via SRCWATCH_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Maximum number of concurrent probes per request.
    ///
    /// Set via SRCWATCH_MAX_CONCURRENCY environment variable.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./srcwatch-cache.sqlite")
}

fn default_user_agent() -> String {
    "srcwatch-validator/0.1 (Municipal Waste Data Verification)".into()
}

fn default_probe_timeout_ms() -> u64 {
    8_000
}

fn default_max_bytes() -> usize {
    2_097_152 // 2MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            probe_timeout_ms: default_probe_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl AppConfig {
    /// Probe timeout as Duration for use with reqwest/tokio.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SRCWATCH_`
    /// 2. TOML file from `SRCWATCH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SRCWATCH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SRCWATCH_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
