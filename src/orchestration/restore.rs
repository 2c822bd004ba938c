//! Restore phase
//!
//! Looks up `[key, restore_key]` and records for the save phase whether the
//! exact key was found. Only an exact hit makes a later save unnecessary.

use crate::cache::CacheConfig;
use crate::error::BuildstashResult;
use crate::provider::CacheProvider;
use crate::state::{PersistedState, StateStore};
use crate::ui::{self, UiContext};
use tracing::{debug, info, warn};

/// Result of the restore phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Provider not usable here; nothing restored, nothing recorded
    Unavailable,
    /// Full key matched
    Hit { key: String },
    /// Only the fallback key matched
    Partial { matched: String },
    /// Nothing matched
    Miss,
    /// Provider raised an error; treated as a miss
    Failed { reason: String },
}

impl RestoreOutcome {
    /// Value of the `cache-hit` step output
    pub fn cache_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }
}

/// Run the restore phase against `provider`, recording the result in `store`
pub async fn restore(
    ctx: &UiContext,
    provider: &dyn CacheProvider,
    store: &dyn StateStore,
    config: &CacheConfig,
    lookup_only: bool,
) -> BuildstashResult<RestoreOutcome> {
    if !provider.is_available().await {
        debug!("Cache provider {} unavailable, skipping restore", provider.name());
        return Ok(RestoreOutcome::Unavailable);
    }

    ui::cache_info(ctx, provider.name(), config);

    let keys = [config.key.clone(), config.restore_key.clone()];
    info!("Restoring cache for key {}", config.key);

    let outcome = match provider.restore(&keys, &config.cache_paths(), lookup_only).await {
        Ok(Some(matched)) if matched == config.key => RestoreOutcome::Hit { key: matched },
        Ok(Some(matched)) => RestoreOutcome::Partial { matched },
        Ok(None) => RestoreOutcome::Miss,
        Err(e) => {
            warn!("Cache restore failed: {}", e);
            RestoreOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };

    match &outcome {
        RestoreOutcome::Hit { key } => {
            PersistedState::mark_up_to_date(store).await?;
            if lookup_only {
                ui::step_ok(ctx, &format!("Cache found for key {} (lookup only)", key));
            } else {
                ui::step_ok(ctx, &format!("Restored from cache key {}", key));
            }
        }
        RestoreOutcome::Partial { matched } => {
            PersistedState::mark_needs_save(store, config).await?;
            ui::step_info(
                ctx,
                &format!(
                    "Restored from fallback key {}; a new cache will be saved under {}",
                    matched, config.key
                ),
            );
        }
        RestoreOutcome::Miss => {
            PersistedState::mark_needs_save(store, config).await?;
            ui::step_info(ctx, "No cache found");
        }
        RestoreOutcome::Failed { reason } => {
            PersistedState::mark_needs_save(store, config).await?;
            ui::step_warn(
                ctx,
                &format!("Cache restore failed, continuing without cache: {}", reason),
            );
        }
        RestoreOutcome::Unavailable => {}
    }

    Ok(outcome)
}
