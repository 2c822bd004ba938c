//! Test doubles shared by the phase tests

use crate::cache::{CacheConfig, CachePath};
use crate::error::{BuildstashError, BuildstashResult};
use crate::provider::CacheProvider;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

pub fn sample_config() -> CacheConfig {
    CacheConfig {
        paths: vec![
            PathBuf::from("/home/runner/go/bin"),
            PathBuf::from("/home/runner/.cache/go-build"),
            PathBuf::from("/home/runner/go/pkg/mod"),
        ],
        key: "v0-go-build-Linux-x64-1a2b3c4d-5e6f7a8b".to_string(),
        restore_key: "v0-go-build-Linux-x64-1a2b3c4d".to_string(),
        key_prefix: "v0-go-build-Linux-x64".to_string(),
        key_env_vars: vec!["CC".to_string()],
        key_files: vec![PathBuf::from("/src/go.mod")],
        cache_bin: true,
        workspaces: vec![PathBuf::from("/src")],
    }
}

/// Provider that records calls and replays canned results
pub struct RecordingProvider {
    available: bool,
    restore_result: Mutex<Option<BuildstashResult<Option<String>>>>,
    save_error: Mutex<Option<BuildstashError>>,
    restores: Mutex<Vec<(Vec<String>, bool)>>,
    saves: Mutex<Vec<(Vec<CachePath>, String)>>,
}

impl RecordingProvider {
    fn with(available: bool, restore_result: BuildstashResult<Option<String>>) -> Self {
        Self {
            available,
            restore_result: Mutex::new(Some(restore_result)),
            save_error: Mutex::new(None),
            restores: Mutex::new(Vec::new()),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(matched: Option<String>) -> Self {
        Self::with(true, Ok(matched))
    }

    pub fn unavailable() -> Self {
        Self::with(false, Ok(None))
    }

    pub fn failing_restore(err: BuildstashError) -> Self {
        Self::with(true, Err(err))
    }

    pub fn failing_save(err: BuildstashError) -> Self {
        let provider = Self::returning(None);
        *provider.save_error.lock().unwrap() = Some(err);
        provider
    }

    pub fn restore_calls(&self) -> Vec<(Vec<String>, bool)> {
        self.restores.lock().unwrap().clone()
    }

    pub fn save_calls(&self) -> Vec<(Vec<CachePath>, String)> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn restore(
        &self,
        keys: &[String],
        _paths: &[CachePath],
        lookup_only: bool,
    ) -> BuildstashResult<Option<String>> {
        self.restores
            .lock()
            .unwrap()
            .push((keys.to_vec(), lookup_only));
        self.restore_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Ok(None))
    }

    async fn save(&self, paths: &[CachePath], key: &str) -> BuildstashResult<()> {
        if let Some(err) = self.save_error.lock().unwrap().take() {
            return Err(err);
        }
        self.saves
            .lock()
            .unwrap()
            .push((paths.to_vec(), key.to_string()));
        Ok(())
    }
}
