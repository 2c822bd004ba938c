//! Provider selection from the `cache-provider` input

use crate::cache::CachePath;
use crate::config::{Config, ConfigManager};
use crate::error::BuildstashResult;
use crate::provider::backend::CacheProvider;
use crate::provider::local::LocalProvider;
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selectable cache backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Tar archives in a local directory
    #[default]
    Local,
    /// Caching switched off; never available
    #[serde(rename = "none")]
    #[value(name = "none")]
    Disabled,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Disabled => write!(f, "none"),
        }
    }
}

/// Backend used for `cache-provider = "none"`
pub struct DisabledProvider;

#[async_trait]
impl CacheProvider for DisabledProvider {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn restore(
        &self,
        _keys: &[String],
        _paths: &[CachePath],
        _lookup_only: bool,
    ) -> BuildstashResult<Option<String>> {
        Ok(None)
    }

    async fn save(&self, _paths: &[CachePath], _key: &str) -> BuildstashResult<()> {
        Ok(())
    }
}

/// Create the provider selected in the configuration
pub fn create_provider(config: &Config) -> Box<dyn CacheProvider> {
    match config.cache.cache_provider {
        ProviderKind::Local => {
            let root = config
                .provider
                .store_dir
                .clone()
                .unwrap_or_else(ConfigManager::default_store_dir);
            Box::new(LocalProvider::new(root))
        }
        ProviderKind::Disabled => Box::new(DisabledProvider),
    }
}
