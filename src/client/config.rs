use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use std::path::PathBuf;
use std::time::Duration;

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Application configuration wrapper.
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app })
    }

    /// Load the configuration: optional TOML file named by `ATTENDANCE_CONFIG`,
    /// then environment overrides.
    ///
    /// - `CLIENT_API_URL`
    /// - `ATTENDANCE_DB_PATH`
    /// - `SYNC_INTERVAL_SECS`
    /// - `PROBE_INTERVAL_SECS`
    /// - `REQUEST_TIMEOUT_SECS`
    pub fn load() -> Result<Self, ConfigError> {
        let mut app = match std::env::var("ATTENDANCE_CONFIG") {
            Ok(path) => {
                let source = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::Parse(format!("{}: {}", path, e)))?;
                AppConfig::from_toml_str(&source)?
            }
            Err(_) => AppConfig::default(),
        };

        if let Ok(url) = std::env::var("CLIENT_API_URL") {
            app.server_url = Some(url);
        }
        if let Ok(path) = std::env::var("ATTENDANCE_DB_PATH") {
            app.database_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = env_secs("SYNC_INTERVAL_SECS")? {
            app.sync_interval_secs = secs;
        }
        if let Some(secs) = env_secs("PROBE_INTERVAL_SECS")? {
            app.probe_interval_secs = secs;
        }
        if let Some(secs) = env_secs("REQUEST_TIMEOUT_SECS")? {
            app.request_timeout_secs = secs;
        }

        app.validate()?;
        Ok(Self { app })
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url().trim_end_matches('/'), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Local database file, defaulting to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.app.database_path.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
            path.push("attendance-sync");
            path.push("local.db");
            path
        })
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.app.sync_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.app.probe_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_secs)
    }

    pub fn auto_sync(&self) -> bool {
        self.app.auto_sync
    }

    pub fn retain_synced(&self) -> bool {
        self.app.retain_synced
    }
}

fn env_secs(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: name,
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
