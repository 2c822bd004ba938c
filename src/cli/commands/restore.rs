//! Restore command - first phase of a cached job

use crate::audit::AuditLog;
use crate::cli::commands::{build_cache_config, state_store};
use crate::config::Config;
use crate::error::{BuildstashError, BuildstashResult};
use crate::orchestration::{self, RestoreOutcome};
use crate::provider::create_provider;
use crate::state::PersistedState;
use crate::ui::UiContext;
use console::style;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

/// Execute the restore command
///
/// Never fails the job: a cache that cannot be restored only costs time.
pub async fn execute(config: &Config) -> BuildstashResult<()> {
    let ctx = UiContext::detect();

    let cache_hit = match run(&ctx, config).await {
        Ok(outcome) => outcome.cache_hit(),
        Err(e) => {
            error!("Restore failed: {}", e);
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            false
        }
    };

    if let Ok(path) = std::env::var("GITHUB_OUTPUT") {
        if let Err(e) = write_output(Path::new(&path), "cache-hit", &cache_hit.to_string()).await {
            debug!("Could not write step output: {}", e);
        }
    }

    Ok(())
}

async fn run(ctx: &UiContext, config: &Config) -> BuildstashResult<RestoreOutcome> {
    let store = state_store(config);
    // Left over from an earlier job whose save never ran
    if let Err(e) = PersistedState::clear(&store).await {
        warn!("Could not clear persisted state: {}", e);
    }

    let cache_config = build_cache_config(config).await?;
    let provider = create_provider(config);

    let outcome = orchestration::restore(
        ctx,
        &*provider,
        &store,
        &cache_config,
        config.cache.lookup_only,
    )
    .await?;

    AuditLog::new(config)
        .log(
            "cache.restore",
            &serde_json::json!({
                "provider": provider.name(),
                "key": cache_config.key,
                "restore_key": cache_config.restore_key,
                "outcome": format!("{:?}", outcome),
            }),
        )
        .await;

    Ok(outcome)
}

/// Append `name=value` to a GitHub Actions output file
async fn write_output(path: &Path, name: &str, value: &str) -> BuildstashResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| BuildstashError::io(format!("opening {}", path.display()), e))?;
    file.write_all(format!("{}={}\n", name, value).as_bytes())
        .await
        .map_err(|e| BuildstashError::io(format!("writing {}", path.display()), e))?;
    Ok(())
}
