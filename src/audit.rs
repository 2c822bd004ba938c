//! Audit logging for cache events
//!
//! Appends JSON lines to the file named by `general.audit_log`. Disabled
//! unless a path is configured.

use crate::config::Config;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-based audit logger that appends JSON lines
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    /// Create a new audit logger from config
    pub fn new(config: &Config) -> Self {
        Self {
            path: config.general.audit_log.clone(),
        }
    }

    /// Log an audit event as a JSON line
    ///
    /// Silently drops events on IO failure; the log never changes the
    /// outcome of a restore or save.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        let Some(path) = &self.path else {
            return;
        };

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = Self::append(path, &line).await {
            warn!("Failed to write audit log: {}", e);
        }
    }

    async fn append(path: &Path, line: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
