//! Cache key derivation
//!
//! Builds two keys from the declared inputs and the environment:
//!
//! - `restore_key` = `<prefix>-<env digest>`: changes only when the
//!   toolchain or a watched environment variable changes.
//! - `key` = `<restore_key>-<content digest>`: additionally changes when
//!   any module's `go.mod` changes.
//!
//! Both digests are computed over inputs sorted ordinally, so neither the
//! host's environment enumeration order nor the declared module order can
//! affect the result.

use crate::cache::digest::{sort_unique, KeyHasher};
use crate::cache::runner::Runner;
use crate::cache::toolchain::ToolchainEnv;
use crate::config::schema::CacheInputs;
use crate::error::{BuildstashError, BuildstashResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Prefix used when no `prefix-key` is declared
pub const DEFAULT_PREFIX: &str = "v0-go";

/// Environment variable prefixes that always contribute to the key
pub const BUILTIN_ENV_PREFIXES: &[&str] =
    &["GO", "CGO_", "CC", "CXX", "CFLAGS", "CPPFLAGS", "LDFLAGS"];

/// Manifest file hashed for each module root
pub const MANIFEST_FILE: &str = "go.mod";

/// Roles of the toolchain directories, in `paths` order
const ROLE_BIN: &str = "bin";
const ROLE_BUILD_CACHE: &str = "build-cache";
const ROLE_MOD_CACHE: &str = "mod-cache";

/// A cached directory tagged with what it holds
///
/// The role is the same on every runner, while the path depends on the
/// runner's home and toolchain layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePath {
    pub role: String,
    pub path: PathBuf,
}

/// Everything the key builder reads
pub struct KeyContext<'a> {
    pub inputs: &'a CacheInputs,
    pub toolchain: &'a ToolchainEnv,
    pub runner: &'a Runner,
    pub env: &'a HashMap<String, String>,
    pub cwd: &'a Path,
}

/// Derived cache configuration, written once by restore and read by save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Directories to persist
    pub paths: Vec<PathBuf>,
    /// Full key: environment plus module contents
    pub key: String,
    /// Environment-only key used as the fallback match
    pub restore_key: String,
    /// Prefix segment shared by both keys
    pub key_prefix: String,
    /// Environment variables that contributed to `restore_key`
    pub key_env_vars: Vec<String>,
    /// Manifest files that contributed to `key`
    pub key_files: Vec<PathBuf>,
    /// Whether the toolchain's bin directory is cached
    pub cache_bin: bool,
    /// Resolved module roots
    pub workspaces: Vec<PathBuf>,
}

impl CacheConfig {
    /// Derive keys and paths for the current run
    pub fn new(ctx: &KeyContext<'_>) -> BuildstashResult<Self> {
        let inputs = ctx.inputs;

        let key_prefix = build_prefix(inputs, ctx.runner);

        let extra_prefixes: Vec<&str> = inputs.env_vars.split_whitespace().collect();
        let key_env_vars = matching_env_vars(ctx.env, &extra_prefixes);

        let mut env_hasher = KeyHasher::new();
        env_hasher.update(ctx.toolchain.fingerprint());
        for name in &key_env_vars {
            env_hasher.update(format!("{}={}\n", name, ctx.env[name]));
        }
        let restore_key = format!("{}-{}", key_prefix, env_hasher.finish());

        let workspaces = parse_workspaces(&inputs.workspaces, ctx.cwd);
        let manifests = sort_unique(
            workspaces
                .iter()
                .map(|root| root.join(MANIFEST_FILE).to_string_lossy().into_owned())
                .collect(),
        );

        let mut content_hasher = KeyHasher::new();
        let mut key_files = Vec::new();
        for manifest in manifests {
            let path = PathBuf::from(manifest);
            let found = content_hasher
                .update_file(&path)
                .map_err(|e| BuildstashError::io(format!("reading {}", path.display()), e))?;
            if found {
                debug!("Hashed manifest {}", path.display());
                key_files.push(path);
            } else {
                debug!("No manifest at {}", path.display());
            }
        }
        let key = format!("{}-{}", restore_key, content_hasher.finish());

        let paths = build_paths(inputs, ctx.toolchain, ctx.cwd);

        Ok(Self {
            paths,
            key,
            restore_key,
            key_prefix,
            key_env_vars,
            key_files,
            cache_bin: inputs.cache_bin,
            workspaces,
        })
    }

    /// `paths` tagged with their roles: `bin`, `build-cache`, `mod-cache`, `extra-<n>`
    pub fn cache_paths(&self) -> Vec<CachePath> {
        let fixed: &[&str] = if self.cache_bin {
            &[ROLE_BIN, ROLE_BUILD_CACHE, ROLE_MOD_CACHE]
        } else {
            &[ROLE_BUILD_CACHE, ROLE_MOD_CACHE]
        };
        self.paths
            .iter()
            .enumerate()
            .map(|(i, path)| CachePath {
                role: fixed
                    .get(i)
                    .map(|role| role.to_string())
                    .unwrap_or_else(|| format!("extra-{}", i - fixed.len())),
                path: path.clone(),
            })
            .collect()
    }

    /// Serialize for the persisted state store
    pub fn to_state(&self) -> BuildstashResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a value written by `to_state`, rejecting unknown or missing fields
    pub fn from_state(value: &str) -> BuildstashResult<Self> {
        serde_json::from_str(value).map_err(|e| BuildstashError::StateCorrupt(e.to_string()))
    }
}

/// `<prefix>[-<shared key> | -<key>-<job>]-<os>-<arch>`
fn build_prefix(inputs: &CacheInputs, runner: &Runner) -> String {
    let base = inputs.prefix_key.trim();
    let mut segments = vec![if base.is_empty() { DEFAULT_PREFIX } else { base }];

    let shared_key = inputs.shared_key.trim();
    let extra_key = inputs.key.trim();
    if !shared_key.is_empty() {
        segments.push(shared_key);
    } else {
        if !extra_key.is_empty() {
            segments.push(extra_key);
        }
        segments.push(&runner.job);
    }

    segments.push(&runner.os);
    segments.push(&runner.arch);
    segments.join("-")
}

/// Names of non-empty variables matching a builtin or extra prefix, sorted
fn matching_env_vars(env: &HashMap<String, String>, extra_prefixes: &[&str]) -> Vec<String> {
    let names = env
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, _)| name)
        .filter(|name| {
            BUILTIN_ENV_PREFIXES
                .iter()
                .chain(extra_prefixes)
                .any(|prefix| name.starts_with(prefix))
        })
        .cloned()
        .collect();
    sort_unique(names)
}

/// Newline-separated module roots, `.` when none are declared
fn parse_workspaces(raw: &str, cwd: &Path) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| absolutize(cwd, Path::new(line)))
        .collect();
    if roots.is_empty() {
        roots.push(absolutize(cwd, Path::new(".")));
    }
    roots
}

fn build_paths(inputs: &CacheInputs, toolchain: &ToolchainEnv, cwd: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if inputs.cache_bin {
        paths.push(toolchain.bin_dir.clone());
    }
    paths.push(toolchain.cache_dir.clone());
    paths.push(toolchain.mod_cache_dir.clone());
    paths.extend(
        inputs
            .cache_directories
            .split_whitespace()
            .map(|dir| absolutize(cwd, Path::new(dir))),
    );
    paths
}

/// Join onto `cwd` and resolve `.`/`..` lexically, without touching the filesystem
fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in cwd.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
