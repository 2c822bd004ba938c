//! Identity of the job and machine a key is built on

use std::collections::HashMap;

/// Job used when no CI job identifier is present
pub const LOCAL_JOB: &str = "local";

/// Job identifier plus the runner's OS and CPU architecture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runner {
    pub job: String,
    pub os: String,
    pub arch: String,
}

impl Runner {
    pub fn new(job: impl Into<String>, os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detect from CI variables, falling back to the host
    ///
    /// `GITHUB_JOB` names the job and `RUNNER_OS` the OS. The architecture
    /// always comes from the host CPU.
    pub fn detect(env: &HashMap<String, String>) -> Self {
        let lookup = |name: &str| {
            env.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            job: lookup("GITHUB_JOB").unwrap_or_else(|| LOCAL_JOB.to_string()),
            os: lookup("RUNNER_OS").unwrap_or_else(|| host_os().to_string()),
            arch: host_arch().to_string(),
        }
    }
}

fn host_os() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        other => other,
    }
}

fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        other => other,
    }
}
