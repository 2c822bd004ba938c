//! Go toolchain introspection
//!
//! Queries `go env -json` for the directories worth caching and fills in
//! anything the toolchain leaves blank from the well-known defaults under
//! the user's home directory.

use crate::error::{BuildstashError, BuildstashResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Variables requested from `go env`
const GO_ENV_VARS: &[&str] = &[
    "GOARCH",
    "GOCACHE",
    "GOMODCACHE",
    "GOBIN",
    "GOPATH",
    "GOOS",
    "GOVERSION",
];

/// Toolchain paths and version, fixed for the lifetime of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainEnv {
    /// Target architecture (GOARCH)
    pub arch: String,
    /// Build cache directory (GOCACHE)
    pub cache_dir: PathBuf,
    /// Module download cache (GOMODCACHE)
    pub mod_cache_dir: PathBuf,
    /// Binary install directory (GOBIN)
    pub bin_dir: PathBuf,
    /// Workspace home (GOPATH)
    pub home: PathBuf,
    /// Target OS (GOOS)
    pub os: String,
    /// Toolchain version (GOVERSION)
    pub version: String,
}

/// Raw `go env -json` output; every field may be missing or empty
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct RawGoEnv {
    #[serde(default)]
    goarch: String,
    #[serde(default)]
    gocache: String,
    #[serde(default)]
    gomodcache: String,
    #[serde(default)]
    gobin: String,
    #[serde(default)]
    gopath: String,
    #[serde(default)]
    goos: String,
    #[serde(default)]
    goversion: String,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl ToolchainEnv {
    /// Parse `go env -json` output, applying fallbacks for blank fields
    ///
    /// `user_home` is the base for `GOPATH` and `user_cache` the base for
    /// `GOCACHE` when the toolchain reports neither.
    pub fn from_go_env_json(
        json: &str,
        user_home: &Path,
        user_cache: &Path,
    ) -> BuildstashResult<Self> {
        let raw: RawGoEnv = serde_json::from_str(json)
            .map_err(|e| BuildstashError::ToolchainOutput(e.to_string()))?;

        // GOPATH may list several entries; Go installs into the first one
        let home = non_empty(raw.gopath)
            .and_then(|p| std::env::split_paths(&p).next())
            .unwrap_or_else(|| user_home.join("go"));

        let mod_cache_dir = non_empty(raw.gomodcache)
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("pkg").join("mod"));
        let bin_dir = non_empty(raw.gobin)
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("bin"));
        let cache_dir = non_empty(raw.gocache)
            .map(PathBuf::from)
            .unwrap_or_else(|| user_cache.join("go-build"));

        Ok(Self {
            arch: non_empty(raw.goarch).unwrap_or_else(|| host_goarch().to_string()),
            cache_dir,
            mod_cache_dir,
            bin_dir,
            home,
            os: non_empty(raw.goos).unwrap_or_else(|| std::env::consts::OS.to_string()),
            version: non_empty(raw.goversion).unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// String fed first into the environment digest
    pub fn fingerprint(&self) -> String {
        format!("{} {}\n", self.version, self.arch)
    }
}

/// Map the host CPU to Go's GOARCH naming
fn host_goarch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Source of the toolchain environment
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Query the toolchain; fails when the toolchain cannot be reached
    async fn query_environment(&self) -> BuildstashResult<ToolchainEnv>;
}

/// Toolchain backed by the `go` command
pub struct GoToolchain {
    binary: PathBuf,
}

impl GoToolchain {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command_line(&self) -> String {
        format!("{} env -json {}", self.binary.display(), GO_ENV_VARS.join(" "))
    }
}

#[async_trait]
impl Toolchain for GoToolchain {
    async fn query_environment(&self) -> BuildstashResult<ToolchainEnv> {
        debug!("Querying toolchain: {}", self.command_line());

        let output = Command::new(&self.binary)
            .arg("env")
            .arg("-json")
            .args(GO_ENV_VARS)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| BuildstashError::ToolchainUnavailable {
                command: self.command_line(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(BuildstashError::ToolchainUnavailable {
                command: self.command_line(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let user_home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let user_cache = dirs::cache_dir().unwrap_or_else(|| user_home.join(".cache"));

        let stdout = String::from_utf8_lossy(&output.stdout);
        let env = ToolchainEnv::from_go_env_json(&stdout, &user_home, &user_cache)?;
        debug!("Toolchain {} ({}/{})", env.version, env.os, env.arch);
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_go_env() {
        let json = r#"{
            "GOARCH": "amd64",
            "GOBIN": "/opt/gobin",
            "GOCACHE": "/home/runner/.cache/go-build",
            "GOMODCACHE": "/home/runner/go/pkg/mod",
            "GOOS": "linux",
            "GOPATH": "/home/runner/go",
            "GOVERSION": "go1.21.5"
        }"#;

        let env =
            ToolchainEnv::from_go_env_json(json, Path::new("/home/x"), Path::new("/tmp/c"))
                .unwrap();

        assert_eq!(env.arch, "amd64");
        assert_eq!(env.bin_dir, PathBuf::from("/opt/gobin"));
        assert_eq!(env.cache_dir, PathBuf::from("/home/runner/.cache/go-build"));
        assert_eq!(env.home, PathBuf::from("/home/runner/go"));
        assert_eq!(env.version, "go1.21.5");
        assert_eq!(env.fingerprint(), "go1.21.5 amd64\n");
    }

    #[test]
    fn blank_fields_fall_back_to_home() {
        // GOBIN is empty by default in real `go env` output
        let json = r#"{"GOBIN": "", "GOVERSION": "go1.22.0", "GOARCH": "arm64"}"#;

        let env =
            ToolchainEnv::from_go_env_json(json, Path::new("/home/x"), Path::new("/var/cache"))
                .unwrap();

        assert_eq!(env.home, PathBuf::from("/home/x/go"));
        assert_eq!(env.bin_dir, PathBuf::from("/home/x/go/bin"));
        assert_eq!(env.mod_cache_dir, PathBuf::from("/home/x/go/pkg/mod"));
        assert_eq!(env.cache_dir, PathBuf::from("/var/cache/go-build"));
    }

    #[test]
    fn missing_version_is_unknown() {
        let env = ToolchainEnv::from_go_env_json("{}", Path::new("/h"), Path::new("/c")).unwrap();
        assert_eq!(env.version, "unknown");
        assert!(!env.arch.is_empty());
    }

    #[test]
    fn rejects_non_json_output() {
        let err = ToolchainEnv::from_go_env_json(
            "go: command not found",
            Path::new("/h"),
            Path::new("/c"),
        )
        .unwrap_err();
        assert!(matches!(err, BuildstashError::ToolchainOutput(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let toolchain = GoToolchain::new("/nonexistent/buildstash-test/go");
        let err = toolchain.query_environment().await.unwrap_err();
        assert!(matches!(err, BuildstashError::ToolchainUnavailable { .. }));
    }
}
