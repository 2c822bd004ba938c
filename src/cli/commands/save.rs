//! Save command - second phase of a cached job

use crate::audit::AuditLog;
use crate::cli::args::SaveArgs;
use crate::cli::commands::state_store;
use crate::config::schema::parse_flag;
use crate::config::Config;
use crate::error::BuildstashResult;
use crate::orchestration::{self, SaveOptions};
use crate::provider::create_provider;
use crate::ui::{self, UiContext};
use tracing::warn;

/// Execute the save command
///
/// Only unreadable persisted state is returned as an error; everything else
/// is reported as a warning so the job keeps its own exit status.
pub async fn execute(args: SaveArgs, config: &Config) -> BuildstashResult<()> {
    let ctx = UiContext::detect();

    let save_enabled = match parse_flag("save-if", &config.cache.save_if, true) {
        Ok(value) => value,
        Err(e) => {
            warn!("{}", e);
            ui::step_warn(&ctx, &format!("Not saving: {}", e));
            return Ok(());
        }
    };

    let options = SaveOptions {
        save_enabled,
        cache_on_failure: config.cache.cache_on_failure,
        job_failed: args.job_status.is_failure(),
    };

    let provider = create_provider(config);
    let store = state_store(config);

    let outcome = match orchestration::save(&ctx, &*provider, &store, options).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_fatal_for_save() => return Err(e),
        Err(e) => {
            warn!("Save failed: {}", e);
            ui::step_warn(&ctx, &format!("Failed to save cache: {}", e));
            return Ok(());
        }
    };

    AuditLog::new(config)
        .log(
            "cache.save",
            &serde_json::json!({
                "provider": provider.name(),
                "outcome": format!("{:?}", outcome),
            }),
        )
        .await;

    Ok(())
}
