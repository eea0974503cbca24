//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LOWNET_*)
//! 2. TOML config file (if LOWNET_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LOWNET_*)
/// 2. TOML config file (if LOWNET_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the proxy serves. Relative paths resolve against it and
    /// responses from it are classified as same-origin.
    ///
    /// Set via LOWNET_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Versioned name of the current bucket.
    ///
    /// Set via LOWNET_CACHE_NAME environment variable. Changing it is a
    /// version bump: the next install populates a fresh bucket and the
    /// following activate deletes every other one.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Path to SQLite bucket store.
    ///
    /// Set via LOWNET_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via LOWNET_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of redirects to follow.
    ///
    /// Set via LOWNET_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Optional HTTP request timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via LOWNET_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Default bucket name; the suffix is the proxy version.
pub const DEFAULT_CACHE_NAME: &str = "lownet-v112";

fn default_origin() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_cache_name() -> String {
    DEFAULT_CACHE_NAME.into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./lownet-cache.sqlite")
}

fn default_user_agent() -> String {
    "lownet/0.1".into()
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_name: default_cache_name(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            timeout_ms: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute
    /// http(s) URL with a host.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {}", url.scheme()),
            });
        }
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid { field: "origin".into(), reason: "missing host".into() });
        }

        Ok(url)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LOWNET_`
    /// 2. TOML file from `LOWNET_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("LOWNET_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LOWNET_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
