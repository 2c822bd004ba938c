//! Cache provider abstraction
//!
//! Storage backends implement this trait; the restore and save phases only
//! ever talk to a `dyn CacheProvider`.

use crate::cache::CachePath;
use crate::error::BuildstashResult;
use async_trait::async_trait;

/// Abstract cache storage backend
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Human-readable provider name for display
    fn name(&self) -> &'static str;

    /// Whether the backend can be used in this environment
    async fn is_available(&self) -> bool;

    /// Restore the first entry matching `keys`, most specific first
    ///
    /// The first key must match exactly; later keys also match any entry whose
    /// key starts with them. Returns the full key of the matched entry. Files
    /// land in the caller's `paths`, matched by role, whatever the paths were
    /// when the entry was saved. With `lookup_only` the match is reported but
    /// no files are written.
    async fn restore(
        &self,
        keys: &[String],
        paths: &[CachePath],
        lookup_only: bool,
    ) -> BuildstashResult<Option<String>>;

    /// Store `paths` under `key`
    async fn save(&self, paths: &[CachePath], key: &str) -> BuildstashResult<()>;
}
