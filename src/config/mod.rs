//! Configuration management for buildstash

pub mod schema;

pub use schema::{CacheInputs, Config};

use crate::error::{BuildstashError, BuildstashResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Name of the project-local configuration file
pub const LOCAL_CONFIG_FILE: &str = ".buildstash.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create a config manager that uses defaults unless a file is discovered
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a config manager with an explicit path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: Some(path),
        }
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("buildstash")
    }

    /// Default location of the restore/save state file
    pub fn default_state_file() -> PathBuf {
        Self::state_dir().join("state.json")
    }

    /// Default directory of the local cache provider
    pub fn default_store_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("buildstash")
            .join("store")
    }

    /// Walk up from `start` looking for `.buildstash.toml`
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, a discovered local file is
    /// used, falling back to defaults.
    pub async fn load(&self, cwd: &Path) -> BuildstashResult<Config> {
        match &self.config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(BuildstashError::ConfigNotFound(path.clone()));
                }
                self.load_from_file(path).await
            }
            None => match Self::find_local_config(cwd) {
                Some(path) => {
                    debug!("Found local config: {}", path.display());
                    self.load_from_file(&path).await
                }
                None => {
                    debug!("No config file found, using defaults");
                    Ok(Config::default())
                }
            },
        }
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> BuildstashResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            BuildstashError::io(format!("reading config from {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| BuildstashError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
