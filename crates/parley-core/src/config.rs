use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::services::DEFAULT_ENDPOINT;

pub const ENDPOINT_ENV: &str = "PARLEY_ENDPOINT";
pub const DATA_DIR_ENV: &str = "PARLEY_DATA_DIR";

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "parley";

/// Application configuration.
///
/// Layered: defaults, then `config.json`, then environment, then CLI flags
/// applied by the binary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Assistant endpoint URL
    pub endpoint: String,
    /// Storage and log directory; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Upper bound for the storage file, in bytes
    pub storage_quota_bytes: Option<usize>,
    /// Origin used to build share links
    pub share_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            data_dir: None,
            log_filter: "info".to_string(),
            storage_quota_bytes: None,
            share_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// `<config_dir>/parley/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Read `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Load from `path` (or the default location) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load_from(&Self::default_path()?)?,
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `PARLEY_*` overrides from `lookup`; blank values are ignored
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = value(ENDPOINT_ENV) {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    key: ENDPOINT_ENV.to_string(),
                    value: endpoint,
                });
            }
            self.endpoint = endpoint;
        }
        if let Some(dir) = value(DATA_DIR_ENV) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        Ok(self)
    }

    /// Configured data directory, or `<data_dir>/parley`
    pub fn resolved_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .ok_or(ConfigError::NoDataDir),
        }
    }
}
