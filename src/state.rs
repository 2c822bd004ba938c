//! State carried from the restore phase to the save phase
//!
//! The two phases run as separate processes, so the derived cache config is
//! handed over through a small key-value store. An empty value under
//! `CONFIG_STATE` means the exact key was already restored. Restore clears
//! the entry before deriving keys and save clears it once done, so a value is
//! never read by a later job.

use crate::cache::CacheConfig;
use crate::error::{BuildstashError, BuildstashResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

/// Name under which the cache config is persisted
pub const CONFIG_STATE: &str = "buildstash-config";

/// Key-value store shared by both phases
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn set(&self, name: &str, value: &str) -> BuildstashResult<()>;

    async fn get(&self, name: &str) -> BuildstashResult<Option<String>>;

    async fn remove(&self, name: &str) -> BuildstashResult<()>;
}

/// What the save phase finds in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedState {
    /// Nothing recorded: restore never ran for this job
    Missing,
    /// Restore matched the full key
    UpToDate,
    /// Restore missed or matched only the fallback key
    NeedsSave(CacheConfig),
}

impl PersistedState {
    /// Record an exact restore hit
    pub async fn mark_up_to_date(store: &dyn StateStore) -> BuildstashResult<()> {
        store.set(CONFIG_STATE, "").await
    }

    /// Record the config the save phase must use
    pub async fn mark_needs_save(
        store: &dyn StateStore,
        config: &CacheConfig,
    ) -> BuildstashResult<()> {
        store.set(CONFIG_STATE, &config.to_state()?).await
    }

    /// Forget whatever an earlier phase recorded
    pub async fn clear(store: &dyn StateStore) -> BuildstashResult<()> {
        store.remove(CONFIG_STATE).await
    }

    /// Read back what restore recorded
    pub async fn load(store: &dyn StateStore) -> BuildstashResult<Self> {
        match store.get(CONFIG_STATE).await? {
            None => Ok(Self::Missing),
            Some(value) if value.is_empty() => Ok(Self::UpToDate),
            Some(value) => Ok(Self::NeedsSave(CacheConfig::from_state(&value)?)),
        }
    }
}

/// JSON object on disk, replaced atomically on every write
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> BuildstashResult<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(BuildstashError::io(
                    format!("reading state file {}", self.path.display()),
                    e,
                ))
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            BuildstashError::StateCorrupt(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> BuildstashResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BuildstashError::io("creating state directory", e))?;
        }

        // Write beside the target and rename so readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp, content)
            .await
            .map_err(|e| BuildstashError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            BuildstashError::io(format!("replacing state file {}", self.path.display()), e)
        })
    }

    async fn delete_file(&self) -> BuildstashResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildstashError::io(
                format!("removing state file {}", self.path.display()),
                e,
            )),
        }
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn set(&self, name: &str, value: &str) -> BuildstashResult<()> {
        let mut entries = self.read_all().await?;
        entries.insert(name.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    async fn get(&self, name: &str) -> BuildstashResult<Option<String>> {
        Ok(self.read_all().await?.remove(name))
    }

    async fn remove(&self, name: &str) -> BuildstashResult<()> {
        let mut entries = match self.read_all().await {
            Ok(entries) => entries,
            // Nothing in an unreadable file can be trusted
            Err(BuildstashError::StateCorrupt(_)) => return self.delete_file().await,
            Err(e) => return Err(e),
        };
        if entries.remove(name).is_none() {
            return Ok(());
        }
        if entries.is_empty() {
            self.delete_file().await
        } else {
            self.write_all(&entries).await
        }
    }
}

/// In-process store, used when both phases share a process
#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn set(&self, name: &str, value: &str) -> BuildstashResult<()> {
        self.entries
            .lock()
            .map_err(|_| BuildstashError::Internal("state store lock poisoned".to_string()))?
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, name: &str) -> BuildstashResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| BuildstashError::Internal("state store lock poisoned".to_string()))?
            .get(name)
            .cloned())
    }

    async fn remove(&self, name: &str) -> BuildstashResult<()> {
        self.entries
            .lock()
            .map_err(|_| BuildstashError::Internal("state store lock poisoned".to_string()))?
            .remove(name);
        Ok(())
    }
}
