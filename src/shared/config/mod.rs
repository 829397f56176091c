//! Application configuration module
//!
//! Provides configuration types for the application. Values can come from a
//! TOML file, environment variables (see `client::config`) or the builder.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server URL
    pub server_url: Option<String>,
    /// Path of the local SQLite file
    pub database_path: Option<PathBuf>,
    /// Periodic sync interval while online
    pub sync_interval_secs: u64,
    /// Reachability probe interval
    pub probe_interval_secs: u64,
    /// Timeout of a single remote request
    pub request_timeout_secs: u64,
    /// Run periodic sync passes in addition to reconnect-triggered ones
    pub auto_sync: bool,
    /// Keep confirmed envelopes flagged `synced` instead of removing them
    pub retain_synced: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            database_path: None,
            sync_interval_secs: 30,
            probe_interval_secs: 10,
            request_timeout_secs: 15,
            auto_sync: true,
            retain_synced: false,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            let parsed =
                reqwest::Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.clone()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        for (field, value) in [
            ("sync_interval_secs", self.sync_interval_secs),
            ("probe_interval_secs", self.probe_interval_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = Some(url.into());
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    pub fn sync_interval_secs(mut self, secs: u64) -> Self {
        self.config.sync_interval_secs = secs;
        self
    }

    pub fn probe_interval_secs(mut self, secs: u64) -> Self {
        self.config.probe_interval_secs = secs;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.config.auto_sync = enabled;
        self
    }

    pub fn retain_synced(mut self, enabled: bool) -> Self {
        self.config.retain_synced = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("could not parse configuration: {0}")]
    Parse(String),
}
