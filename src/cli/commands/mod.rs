//! CLI command implementations

pub mod key;
pub mod restore;
pub mod save;

pub use key::execute as key;
pub use restore::execute as restore;
pub use save::execute as save;

use crate::cache::{CacheConfig, GoToolchain, KeyContext, Runner, Toolchain};
use crate::config::{Config, ConfigManager};
use crate::error::{BuildstashError, BuildstashResult};
use crate::state::FileStateStore;
use std::collections::HashMap;

/// Snapshot of the process environment; non-UTF-8 entries are skipped
pub(crate) fn process_env() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Query the toolchain and derive the cache config for this run
pub(crate) async fn build_cache_config(config: &Config) -> BuildstashResult<CacheConfig> {
    let env = process_env();
    let cwd = std::env::current_dir()
        .map_err(|e| BuildstashError::io("getting current directory", e))?;
    let runner = Runner::detect(&env);
    let toolchain = GoToolchain::new(&config.toolchain.go)
        .query_environment()
        .await?;

    CacheConfig::new(&KeyContext {
        inputs: &config.cache,
        toolchain: &toolchain,
        runner: &runner,
        env: &env,
        cwd: &cwd,
    })
}

/// State store shared by restore and save
pub(crate) fn state_store(config: &Config) -> FileStateStore {
    FileStateStore::new(
        config
            .state
            .file
            .clone()
            .unwrap_or_else(ConfigManager::default_state_file),
    )
}
