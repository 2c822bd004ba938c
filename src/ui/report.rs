//! Audit block describing how a cache key was derived

use super::context::UiContext;
use super::output::{end_group, group, key_value, list};
use crate::cache::CacheConfig;
use std::path::PathBuf;

fn display_paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

/// Print provider, inputs and both keys; purely informational
pub fn cache_info(ctx: &UiContext, provider: &str, config: &CacheConfig) {
    group(ctx, "Cache Configuration");
    key_value(ctx, "Cache Provider", provider);
    list(ctx, "Workspaces", &display_paths(&config.workspaces));
    list(ctx, "Cache Paths", &display_paths(&config.paths));
    key_value(ctx, "Restore Key", &config.restore_key);
    key_value(ctx, "Cache Key", &config.key);
    key_value(ctx, ".. Prefix", &config.key_prefix);
    list(ctx, ".. Environment considered", &config.key_env_vars);
    list(ctx, ".. Manifests considered", &display_paths(&config.key_files));
    end_group(ctx);
}
