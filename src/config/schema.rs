//! Configuration schema for buildstash
//!
//! Configuration is read from `.buildstash.toml` (or `--config`). Every
//! `[cache]` input can also be given on the command line or through a
//! `BUILDSTASH_*` environment variable, which take precedence.

use crate::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Declared cache inputs
    pub cache: CacheInputs,

    /// Toolchain settings
    pub toolchain: ToolchainConfig,

    /// Cross-phase state settings
    pub state: StateConfig,

    /// Cache provider settings
    pub provider: ProviderConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append restore/save events as JSON lines to this file
    pub audit_log: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: None,
        }
    }
}

/// Declared inputs that shape the cache key and the save decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheInputs {
    /// Base of every key (default "v0-go")
    pub prefix_key: String,

    /// Key shared across jobs; replaces `key` + job id when set
    pub shared_key: String,

    /// Extra key segment placed before the job id
    pub key: String,

    /// Whitespace-separated extra environment variable prefixes
    pub env_vars: String,

    /// Newline-separated module roots
    pub workspaces: String,

    /// Whitespace-separated extra directories to cache
    pub cache_directories: String,

    /// Save even when the job failed
    pub cache_on_failure: bool,

    /// Save predicate, evaluated as a boolean string
    pub save_if: String,

    /// Check for a cache hit without restoring files
    pub lookup_only: bool,

    /// Which cache backend to use
    pub cache_provider: ProviderKind,

    /// Cache the toolchain's binary install directory
    pub cache_bin: bool,
}

impl Default for CacheInputs {
    fn default() -> Self {
        Self {
            prefix_key: "v0-go".to_string(),
            shared_key: String::new(),
            key: String::new(),
            env_vars: String::new(),
            workspaces: ".".to_string(),
            cache_directories: String::new(),
            cache_on_failure: false,
            save_if: "true".to_string(),
            lookup_only: false,
            cache_provider: ProviderKind::default(),
            cache_bin: true,
        }
    }
}

/// Toolchain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Path or name of the `go` binary
    pub go: PathBuf,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            go: PathBuf::from("go"),
        }
    }
}

/// State store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// JSON file carrying state from restore to save
    pub file: Option<PathBuf>,
}

/// Provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Directory used by the local provider
    pub store_dir: Option<PathBuf>,
}

/// Parse a boolean input string; empty means `default`
pub fn parse_flag(name: &str, value: &str, default: bool) -> crate::BuildstashResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(crate::BuildstashError::input(name, value)),
    }
}
