//! Directory-backed cache provider
//!
//! Each saved key becomes two files in the store directory:
//!
//! | File | Contents |
//! |------|----------|
//! | `<id>.tar` | One top-level entry per cached path, named by its role |
//! | `<id>.json` | Key, cached paths with their roles and creation time |
//!
//! `<id>` is a hash of the key, so arbitrary key text never reaches the
//! filesystem. Prefix matching reads the JSON sidecars. Restores write into
//! the caller's paths by role, so an entry saved by a runner with another
//! home directory or `cache-bin` setting still lands in the right place.

use crate::cache::CachePath;
use crate::error::{BuildstashError, BuildstashResult};
use crate::provider::backend::CacheProvider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Metadata stored next to every archive
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    paths: Vec<CachePath>,
    created_at: DateTime<Utc>,
}

/// Directory modes applied once every archive entry is written
///
/// Go leaves its module cache read-only, so a directory's archived mode
/// can only be set after nothing else needs to be created below it.
#[derive(Default)]
struct DeferredModes {
    order: Vec<(PathBuf, u32)>,
    index: HashMap<PathBuf, usize>,
}

impl DeferredModes {
    /// Make `dir` writable until `apply`, remembering the mode it had
    fn unlock(&mut self, dir: &Path) -> io::Result<()> {
        if self.index.contains_key(dir) {
            return Ok(());
        }
        if let Some(mode) = make_writable(dir)? {
            self.set(dir.to_path_buf(), mode);
        }
        Ok(())
    }

    fn set(&mut self, dir: PathBuf, mode: u32) {
        match self.index.get(&dir) {
            Some(&i) => self.order[i].1 = mode,
            None => {
                self.index.insert(dir.clone(), self.order.len());
                self.order.push((dir, mode));
            }
        }
    }

    /// Deepest directories first, so a parent never blocks its children
    fn apply(self) -> io::Result<()> {
        for (dir, mode) in self.order.into_iter().rev() {
            set_mode(&dir, mode)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn make_writable(dir: &Path) -> io::Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(dir)?.permissions().mode() & 0o7777;
    if mode & 0o700 == 0o700 {
        return Ok(None);
    }
    fs::set_permissions(dir, fs::Permissions::from_mode(mode | 0o700))?;
    Ok(Some(mode))
}

#[cfg(unix)]
fn set_mode(dir: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn make_writable(dir: &Path) -> io::Result<Option<u32>> {
    let mut perms = fs::metadata(dir)?.permissions();
    if !perms.readonly() {
        return Ok(None);
    }
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(dir, perms)?;
    Ok(Some(0o555))
}

#[cfg(not(unix))]
fn set_mode(dir: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(dir)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(dir, perms)
}

/// Cache provider storing tar archives under a root directory
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_id(key: &str) -> String {
        hex::encode(&Sha256::digest(key.as_bytes())[..8])
    }

    fn archive_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.tar", Self::entry_id(key)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", Self::entry_id(key)))
    }

    fn list_entries(root: &Path) -> io::Result<Vec<EntryMeta>> {
        let mut entries = Vec::new();
        let dir = match fs::read_dir(root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e),
        };

        for item in dir {
            let path = item?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .ok()
                .and_then(|content| serde_json::from_str::<EntryMeta>(&content).ok());
            match parsed {
                Some(meta) => entries.push(meta),
                None => warn!("Ignoring unreadable cache entry {}", path.display()),
            }
        }
        Ok(entries)
    }

    /// First key exact, later keys by prefix; newest entry wins among prefix matches
    fn find_match(entries: &[EntryMeta], keys: &[String]) -> Option<EntryMeta> {
        for (i, key) in keys.iter().enumerate() {
            if let Some(exact) = entries.iter().find(|e| &e.key == key) {
                return Some(exact.clone());
            }
            if i == 0 {
                continue;
            }
            let newest = entries
                .iter()
                .filter(|e| e.key.starts_with(key.as_str()))
                .max_by_key(|e| e.created_at);
            if let Some(entry) = newest {
                return Some(entry.clone());
            }
        }
        None
    }

    fn extract(archive: &Path, paths: &[CachePath]) -> io::Result<()> {
        let file = fs::File::open(archive)?;
        let mut tar = tar::Archive::new(file);
        let mut modes = DeferredModes::default();

        for entry in tar.entries()? {
            let mut entry = entry?;
            let entry_path = entry.path()?.into_owned();
            let Some(dest) = Self::destination(&entry_path, paths) else {
                debug!("No destination for archive entry {}", entry_path.display());
                continue;
            };

            if entry.header().entry_type().is_dir() {
                fs::create_dir_all(&dest)?;
                modes.unlock(&dest)?;
                modes.set(dest, entry.header().mode()?);
                continue;
            }

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
                modes.unlock(parent)?;
            }
            if dest.is_symlink() || dest.is_file() {
                fs::remove_file(&dest)?;
            }
            entry.unpack(&dest)?;
        }

        modes.apply()
    }

    /// Map `<role>/<rest>` onto the caller's path for that role, refusing traversal
    fn destination(entry_path: &Path, paths: &[CachePath]) -> Option<PathBuf> {
        let mut components = entry_path.components();
        let role = match components.next()? {
            Component::Normal(first) => first.to_str()?,
            _ => return None,
        };
        let mut dest = paths.iter().find(|cached| cached.role == role)?.path.clone();
        for component in components {
            match component {
                Component::Normal(part) => dest.push(part),
                _ => return None,
            }
        }
        Some(dest)
    }

    fn write_archive(archive: &Path, paths: &[CachePath]) -> io::Result<()> {
        let tmp = archive.with_extension("tar.tmp");
        let file = fs::File::create(&tmp)?;
        let mut builder = tar::Builder::new(file);
        builder.follow_symlinks(false);

        for cached in paths {
            if cached.path.is_dir() {
                builder.append_dir_all(&cached.role, &cached.path)?;
            } else {
                debug!("Not caching missing directory {}", cached.path.display());
            }
        }

        builder.into_inner()?.sync_all()?;
        fs::rename(&tmp, archive)
    }
}

fn blocking_error(provider: &str, e: tokio::task::JoinError) -> BuildstashError {
    BuildstashError::provider(provider, format!("worker task failed: {e}"))
}

#[async_trait]
impl CacheProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn is_available(&self) -> bool {
        match tokio::fs::create_dir_all(&self.root).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Local store {} unusable: {}", self.root.display(), e);
                false
            }
        }
    }

    async fn restore(
        &self,
        keys: &[String],
        paths: &[CachePath],
        lookup_only: bool,
    ) -> BuildstashResult<Option<String>> {
        let root = self.root.clone();
        let entries = tokio::task::spawn_blocking(move || Self::list_entries(&root))
            .await
            .map_err(|e| blocking_error(self.name(), e))?
            .map_err(|e| BuildstashError::provider(self.name(), e.to_string()))?;

        let Some(meta) = Self::find_match(&entries, keys) else {
            return Ok(None);
        };

        if lookup_only {
            debug!("Lookup only, not extracting {}", meta.key);
            return Ok(Some(meta.key));
        }

        let archive = self.archive_path(&meta.key);
        let key = meta.key;
        let owned_paths = paths.to_vec();
        tokio::task::spawn_blocking(move || Self::extract(&archive, &owned_paths))
            .await
            .map_err(|e| blocking_error(self.name(), e))?
            .map_err(|e| {
                BuildstashError::provider(self.name(), format!("extracting {key}: {e}"))
            })?;

        Ok(Some(key))
    }

    async fn save(&self, paths: &[CachePath], key: &str) -> BuildstashResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| BuildstashError::io(format!("creating {}", self.root.display()), e))?;

        let archive = self.archive_path(key);
        let owned_paths = paths.to_vec();
        tokio::task::spawn_blocking(move || Self::write_archive(&archive, &owned_paths))
            .await
            .map_err(|e| blocking_error(self.name(), e))?
            .map_err(|e| {
                BuildstashError::provider(self.name(), format!("archiving {key}: {e}"))
            })?;

        let meta = EntryMeta {
            key: key.to_string(),
            paths: paths.to_vec(),
            created_at: Utc::now(),
        };
        let meta_path = self.meta_path(key);
        let tmp = meta_path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(&meta)?)
            .await
            .map_err(|e| BuildstashError::io(format!("writing {}", tmp.display()), e))?;
        tokio::fs::rename(&tmp, &meta_path)
            .await
            .map_err(|e| BuildstashError::io(format!("writing {}", meta_path.display()), e))?;

        debug!("Saved {} into {}", key, self.root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta(key: &str, age_secs: i64) -> EntryMeta {
        EntryMeta {
            key: key.to_string(),
            paths: vec![],
            created_at: Utc::now() - chrono::Duration::seconds(age_secs),
        }
    }

    fn cached(role: &str, path: impl Into<PathBuf>) -> CachePath {
        CachePath {
            role: role.to_string(),
            path: path.into(),
        }
    }

    fn matched_key(entries: &[EntryMeta], keys: &[String]) -> Option<String> {
        LocalProvider::find_match(entries, keys).map(|e| e.key)
    }

    #[test]
    fn find_match_prefers_exact_primary_key() {
        let entries = vec![meta("v0-go-a-1111", 10), meta("v0-go-a-2222", 5)];
        let keys = vec!["v0-go-a-1111".to_string(), "v0-go-a".to_string()];
        assert_eq!(matched_key(&entries, &keys), Some("v0-go-a-1111".to_string()));
    }

    #[test]
    fn find_match_uses_newest_prefix_for_fallback() {
        let entries = vec![meta("v0-go-a-1111", 10), meta("v0-go-a-2222", 5)];
        let keys = vec!["v0-go-a-3333".to_string(), "v0-go-a".to_string()];
        assert_eq!(matched_key(&entries, &keys), Some("v0-go-a-2222".to_string()));
    }

    #[test]
    fn primary_key_is_not_prefix_matched() {
        let entries = vec![meta("v0-go-a-1111", 10)];
        let keys = vec!["v0-go-a".to_string()];
        assert_eq!(matched_key(&entries, &keys), None);
    }

    #[test]
    fn destination_rejects_traversal() {
        let paths = vec![cached("mod-cache", "/cache/mod")];
        assert_eq!(
            LocalProvider::destination(Path::new("mod-cache/golang.org/x"), &paths),
            Some(PathBuf::from("/cache/mod/golang.org/x"))
        );
        assert_eq!(LocalProvider::destination(Path::new("mod-cache/../etc"), &paths), None);
        assert_eq!(LocalProvider::destination(Path::new("bin/file"), &paths), None);
        assert_eq!(LocalProvider::destination(Path::new("/etc/passwd"), &paths), None);
    }

    #[tokio::test]
    async fn save_then_restore_roundtrip() {
        let store = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let cache_dir = work.path().join("go-build");
        fs::create_dir_all(cache_dir.join("ab")).unwrap();
        fs::write(cache_dir.join("ab").join("obj-d"), b"compiled").unwrap();

        let provider = LocalProvider::new(store.path());
        assert!(provider.is_available().await);

        let paths = vec![
            cached("build-cache", &cache_dir),
            cached("mod-cache", work.path().join("never-created")),
        ];
        provider.save(&paths, "v0-go-build-Linux-x64-aaaa-bbbb").await.unwrap();

        fs::remove_dir_all(&cache_dir).unwrap();

        let keys = vec![
            "v0-go-build-Linux-x64-aaaa-cccc".to_string(),
            "v0-go-build-Linux-x64-aaaa".to_string(),
        ];

        let looked_up = provider.restore(&keys, &paths, true).await.unwrap();
        assert_eq!(looked_up.as_deref(), Some("v0-go-build-Linux-x64-aaaa-bbbb"));
        assert!(!cache_dir.exists());

        let restored = provider.restore(&keys, &paths, false).await.unwrap();
        assert_eq!(restored.as_deref(), Some("v0-go-build-Linux-x64-aaaa-bbbb"));
        assert_eq!(fs::read(cache_dir.join("ab").join("obj-d")).unwrap(), b"compiled");
    }

    #[tokio::test]
    async fn restore_writes_into_callers_paths() {
        let store = TempDir::new().unwrap();
        let saver = TempDir::new().unwrap();
        let restorer = TempDir::new().unwrap();

        for dir in ["bin", "go-build", "mod"] {
            fs::create_dir_all(saver.path().join(dir)).unwrap();
            fs::write(saver.path().join(dir).join("item"), dir).unwrap();
        }
        let saved_paths = vec![
            cached("bin", saver.path().join("bin")),
            cached("build-cache", saver.path().join("go-build")),
            cached("mod-cache", saver.path().join("mod")),
        ];
        let provider = LocalProvider::new(store.path());
        provider.save(&saved_paths, "k-1-2").await.unwrap();

        // Another home directory and no bin directory cached
        let restore_paths = vec![
            cached("build-cache", restorer.path().join("cache")),
            cached("mod-cache", restorer.path().join("pkg").join("mod")),
        ];
        let keys = vec!["k-1-3".to_string(), "k-1".to_string()];
        let matched = provider.restore(&keys, &restore_paths, false).await.unwrap();

        assert_eq!(matched.as_deref(), Some("k-1-2"));
        assert_eq!(
            fs::read_to_string(restorer.path().join("cache").join("item")).unwrap(),
            "go-build"
        );
        assert_eq!(
            fs::read_to_string(restorer.path().join("pkg").join("mod").join("item")).unwrap(),
            "mod"
        );
        assert!(!restorer.path().join("bin").exists());
    }

    #[cfg(unix)]
    fn set_tree_mode(root: &Path, dir_mode: u32, file_mode: u32) {
        use std::os::unix::fs::PermissionsExt;

        // Children first while the directory is still writable
        for item in fs::read_dir(root).unwrap() {
            let path = item.unwrap().path();
            if path.is_dir() {
                set_tree_mode(&path, dir_mode, file_mode);
            } else {
                fs::set_permissions(&path, fs::Permissions::from_mode(file_mode)).unwrap();
            }
        }
        fs::set_permissions(root, fs::Permissions::from_mode(dir_mode)).unwrap();
    }

    #[cfg(unix)]
    fn unlock_tree(root: &Path) {
        use std::os::unix::fs::PermissionsExt;

        if !root.exists() {
            return;
        }
        fs::set_permissions(root, fs::Permissions::from_mode(0o755)).unwrap();
        for item in fs::read_dir(root).unwrap() {
            let path = item.unwrap().path();
            if path.is_dir() {
                unlock_tree(&path);
            }
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn read_only_module_cache_restores() {
        use std::os::unix::fs::PermissionsExt;

        let store = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let mod_cache = work.path().join("mod");
        let module = mod_cache.join("golang.org").join("x").join("text@v0.3.0");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("go.mod"), "module golang.org/x/text\n").unwrap();
        set_tree_mode(&module, 0o555, 0o444);

        let paths = vec![cached("mod-cache", &mod_cache)];
        let provider = LocalProvider::new(store.path());
        provider.save(&paths, "k-1-2").await.unwrap();

        let keys = vec!["k-1-2".to_string(), "k-1".to_string()];

        // Over the existing read-only tree
        let matched = provider.restore(&keys, &paths, false).await.unwrap();
        assert_eq!(matched.as_deref(), Some("k-1-2"));

        // Into a fresh location
        let fresh = work.path().join("fresh");
        let fresh_paths = vec![cached("mod-cache", &fresh)];
        provider.restore(&keys, &fresh_paths, false).await.unwrap();

        let restored = fresh.join("golang.org").join("x").join("text@v0.3.0");
        assert_eq!(
            fs::read_to_string(restored.join("go.mod")).unwrap(),
            "module golang.org/x/text\n"
        );
        let mode = fs::metadata(&restored).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o555);

        unlock_tree(&mod_cache);
        unlock_tree(&fresh);
    }

    #[tokio::test]
    async fn restore_from_empty_store_misses() {
        let store = TempDir::new().unwrap();
        let provider = LocalProvider::new(store.path().join("store"));
        let keys = vec!["a-b".to_string(), "a".to_string()];
        assert_eq!(provider.restore(&keys, &[], false).await.unwrap(), None);
    }
}
