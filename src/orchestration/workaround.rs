//! Host-specific fixups applied before archiving cache directories

use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Best-effort preparation before a save; never fails
///
/// On macOS runners, tar can read stale data for files written moments
/// earlier unless the disk cache is purged first.
pub async fn before_save() {
    if std::env::consts::OS != "macos" {
        return;
    }

    let result = Command::new("sudo")
        .args(["-n", "/usr/sbin/purge"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) if status.success() => debug!("Purged disk cache before save"),
        Ok(status) => debug!("purge exited with {}", status),
        Err(e) => debug!("purge unavailable: {}", e),
    }
}
