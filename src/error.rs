//! Error types for buildstash
//!
//! All modules use `BuildstashResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildstash operations
pub type BuildstashResult<T> = Result<T, BuildstashError>;

/// All errors that can occur in buildstash
#[derive(Error, Debug)]
pub enum BuildstashError {
    // Toolchain errors
    #[error("Go toolchain not available: {command}: {reason}")]
    ToolchainUnavailable { command: String, reason: String },

    #[error("Unexpected `go env` output: {0}")]
    ToolchainOutput(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid value for input `{name}`: {value:?}")]
    InputInvalid { name: String, value: String },

    // State errors
    #[error("Persisted cache state is corrupt: {0}")]
    StateCorrupt(String),

    // Provider errors
    #[error("Cache provider `{provider}` failed: {reason}")]
    Provider { provider: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BuildstashError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a provider error
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error
    pub fn input(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InputInvalid {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether the error aborts the save phase instead of being downgraded to a warning
    pub fn is_fatal_for_save(&self) -> bool {
        matches!(self, Self::StateCorrupt(_))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ToolchainUnavailable { .. } => {
                Some("Install Go or point --go at the toolchain binary")
            }
            Self::StateCorrupt(_) => {
                Some("Re-run the restore step; the state file must come from the same job")
            }
            Self::InputInvalid { .. } => Some("Boolean inputs accept true/false, yes/no, 1/0"),
            _ => None,
        }
    }
}
