//! Save phase
//!
//! Runs after the job's own work. Uses the keys recorded by the restore
//! phase verbatim and never re-derives them.

use crate::error::BuildstashResult;
use crate::orchestration::workaround;
use crate::provider::CacheProvider;
use crate::state::{PersistedState, StateStore};
use crate::ui::{self, UiContext};
use tracing::{debug, info, warn};

/// Gates evaluated before anything is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Result of the `save-if` predicate
    pub save_enabled: bool,
    /// Save even though the job failed
    pub cache_on_failure: bool,
    /// Whether the job this step belongs to failed
    pub job_failed: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            save_enabled: true,
            cache_on_failure: false,
            job_failed: false,
        }
    }
}

/// Result of the save phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Provider not usable here
    Unavailable,
    /// `save-if` evaluated to false
    Disabled,
    /// Restore never recorded anything for this job
    NotRestored,
    /// Restore matched the full key
    UpToDate,
    /// Job failed and `cache-on-failure` is off
    SkippedJobFailed,
    /// Paths stored under `key`
    Saved { key: String },
    /// Provider raised an error; reported, never fatal
    Failed { key: String, reason: String },
}

/// Run the save phase
///
/// The only error returned is an unreadable persisted state; provider
/// failures are folded into `SaveOutcome::Failed`. Whatever restore recorded
/// is cleared afterwards, so it can never be replayed by a later job.
pub async fn save(
    ctx: &UiContext,
    provider: &dyn CacheProvider,
    store: &dyn StateStore,
    options: SaveOptions,
) -> BuildstashResult<SaveOutcome> {
    let outcome = run(ctx, provider, store, options).await;

    if let Err(e) = PersistedState::clear(store).await {
        warn!("Could not clear persisted state: {}", e);
    }

    outcome
}

async fn run(
    ctx: &UiContext,
    provider: &dyn CacheProvider,
    store: &dyn StateStore,
    options: SaveOptions,
) -> BuildstashResult<SaveOutcome> {
    if !provider.is_available().await {
        debug!("Cache provider {} unavailable, skipping save", provider.name());
        return Ok(SaveOutcome::Unavailable);
    }
    if !options.save_enabled {
        debug!("save-if is false, skipping save");
        return Ok(SaveOutcome::Disabled);
    }
    if options.job_failed && !options.cache_on_failure {
        ui::step_info(ctx, "Job failed and cache-on-failure is off, not saving");
        return Ok(SaveOutcome::SkippedJobFailed);
    }

    let config = match PersistedState::load(store).await? {
        PersistedState::Missing => {
            ui::step_info(ctx, "No restore recorded for this job, not saving");
            return Ok(SaveOutcome::NotRestored);
        }
        PersistedState::UpToDate => {
            ui::step_ok(ctx, "Cache up-to-date");
            return Ok(SaveOutcome::UpToDate);
        }
        PersistedState::NeedsSave(config) => config,
    };

    workaround::before_save().await;

    info!("Saving {} path(s) under {}", config.paths.len(), config.key);
    match provider.save(&config.cache_paths(), &config.key).await {
        Ok(()) => {
            ui::step_ok(ctx, &format!("Saved cache under {}", config.key));
            Ok(SaveOutcome::Saved { key: config.key })
        }
        Err(e) => {
            warn!("Cache save failed: {}", e);
            ui::step_warn(ctx, &format!("Failed to save cache: {}", e));
            Ok(SaveOutcome::Failed {
                key: config.key,
                reason: e.to_string(),
            })
        }
    }
}
