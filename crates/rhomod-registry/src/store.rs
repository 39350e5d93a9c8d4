//! Durable backing stores for the registry.
//!
//! A store only ever gains entries. [`RegistryStore::insert`] merges one
//! entry into whatever is already persisted and returns the handle that is
//! durably recorded for the hash, which is the existing one if another
//! writer got there first.

use crate::config::RegistryConfig;
use crate::handle::ModuleHandle;
use crate::hash::ContentHash;
use crate::jsonl::{JsonlError, RegistryEntry, append_entry_to_path, read_entries_from_path};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Errors raised while loading or persisting registry state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("registry lock busy: {lock_path}")]
    LockBusy { lock_path: String },

    #[error("failed to acquire registry lock {lock_path}: {message}")]
    LockIo { lock_path: String, message: String },

    #[error("registry store task failed: {0}")]
    Task(String),
}

/// Persisted `content hash → handle` mapping.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Read every persisted entry.
    async fn load(&self) -> Result<BTreeMap<ContentHash, ModuleHandle>, StoreError>;

    /// Durably record one entry, keeping any handle already stored for `hash`.
    async fn insert(
        &self,
        hash: ContentHash,
        handle: ModuleHandle,
    ) -> Result<ModuleHandle, StoreError>;
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<BTreeMap<ContentHash, ModuleHandle>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (ContentHash, ModuleHandle)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }

    pub async fn snapshot(&self) -> BTreeMap<ContentHash, ModuleHandle> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl RegistryStore for InMemoryStore {
    async fn load(&self) -> Result<BTreeMap<ContentHash, ModuleHandle>, StoreError> {
        Ok(self.entries.lock().await.clone())
    }

    async fn insert(
        &self,
        hash: ContentHash,
        handle: ModuleHandle,
    ) -> Result<ModuleHandle, StoreError> {
        let mut entries = self.entries.lock().await;
        Ok(entries.entry(hash).or_insert(handle).clone())
    }
}

/// JSONL file store shared safely between tasks and processes.
///
/// Writers in this process queue on an async mutex; writers in other
/// processes are excluded by a `<path>.lock` file. Each insert re-reads the
/// log under the lock and appends one line if the hash is new, so
/// concurrent inserts for different hashes never lose one another.
#[derive(Debug)]
pub struct JsonlFileStore {
    config: RegistryConfig,
    write_gate: Mutex<()>,
}

impl JsonlFileStore {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            write_gate: Mutex::new(()),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::new(RegistryConfig::at(path))
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    async fn acquire_lock(&self) -> Result<RegistryFileLockGuard, StoreError> {
        let lock_path = registry_lock_path(&self.config.path);
        for attempt in 0..=self.config.lock_retries {
            if let Some(guard) = RegistryFileLockGuard::try_acquire(&lock_path)? {
                return Ok(guard);
            }
            tracing::debug!(
                lock_path = %lock_path.display(),
                attempt,
                "registry lock busy"
            );
            tokio::time::sleep(self.config.lock_retry_delay()).await;
        }
        Err(StoreError::LockBusy {
            lock_path: lock_path.display().to_string(),
        })
    }
}

#[async_trait]
impl RegistryStore for JsonlFileStore {
    async fn load(&self) -> Result<BTreeMap<ContentHash, ModuleHandle>, StoreError> {
        let path = self.config.path.clone();
        let entries = tokio::task::spawn_blocking(move || read_entries_from_path(&path))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;
        Ok(index_entries(entries))
    }

    async fn insert(
        &self,
        hash: ContentHash,
        handle: ModuleHandle,
    ) -> Result<ModuleHandle, StoreError> {
        let _gate = self.write_gate.lock().await;
        let lock = self.acquire_lock().await?;
        let path = self.config.path.clone();

        tokio::task::spawn_blocking(move || record_entry(lock, &path, hash, handle))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Append `handle` unless the log already holds one for `hash`.
///
/// Takes the lock by value so it is released only when the write is done,
/// even if the task that asked for the write has gone away.
fn record_entry(
    lock: RegistryFileLockGuard,
    path: &Path,
    hash: ContentHash,
    handle: ModuleHandle,
) -> Result<ModuleHandle, StoreError> {
    let _lock = lock;
    let index = index_entries(read_entries_from_path(path)?);
    if let Some(existing) = index.get(&hash) {
        return Ok(existing.clone());
    }
    append_entry_to_path(
        path,
        &RegistryEntry {
            content_hash: hash,
            handle: handle.clone(),
        },
    )?;
    Ok(handle)
}

/// Duplicate hashes resolve to the last line.
fn index_entries(entries: Vec<RegistryEntry>) -> BTreeMap<ContentHash, ModuleHandle> {
    entries
        .into_iter()
        .map(|entry| (entry.content_hash, entry.handle))
        .collect()
}

pub fn registry_lock_path(registry_path: &Path) -> PathBuf {
    let mut path: OsString = registry_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

struct RegistryFileLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl RegistryFileLockGuard {
    /// `Ok(None)` when another writer holds the lock.
    fn try_acquire(lock_path: &Path) -> Result<Option<Self>, StoreError> {
        let lock_io = |message: String| StoreError::LockIo {
            lock_path: lock_path.display().to_string(),
            message,
        };
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| lock_io(e.to_string()))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Some(Self {
                    lock_path: lock_path.to_path_buf(),
                    _file: file,
                }))
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(err) => Err(lock_io(err.to_string())),
        }
    }
}

impl Drop for RegistryFileLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "rhomod-store-{prefix}-{}-{unique}",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn in_memory_insert_keeps_first_handle() {
        let store = InMemoryStore::new();
        let hash = ContentHash::of_source("m");
        let first = store.insert(hash, ModuleHandle::new("rho:id:1")).await.unwrap();
        let second = store.insert(hash, ModuleHandle::new("rho:id:2")).await.unwrap();
        assert_eq!(first.uri, "rho:id:1");
        assert_eq!(second.uri, "rho:id:1");
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn file_store_persists_and_reloads() {
        let dir = temp_path("reload");
        let path = dir.join("registry.jsonl");
        let store = JsonlFileStore::at(&path);
        let hash = ContentHash::of_source("module a");
        store
            .insert(hash, ModuleHandle::new("rho:id:a").with_name("A"))
            .await
            .unwrap();

        let reopened = JsonlFileStore::at(&path).load().await.unwrap();
        assert_eq!(
            reopened.get(&hash),
            Some(&ModuleHandle::new("rho:id:a").with_name("A"))
        );
        assert!(!registry_lock_path(&path).exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn file_store_merges_writes_from_independent_handles() {
        let dir = temp_path("merge");
        let path = dir.join("registry.jsonl");
        let left = JsonlFileStore::at(&path);
        let right = JsonlFileStore::at(&path);

        left.insert(ContentHash::of_source("a"), ModuleHandle::new("rho:id:a"))
            .await
            .unwrap();
        right
            .insert(ContentHash::of_source("b"), ModuleHandle::new("rho:id:b"))
            .await
            .unwrap();

        let all = left.load().await.unwrap();
        assert_eq!(all.len(), 2);

        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_for_different_hashes_all_persist() {
        let dir = temp_path("concurrent");
        let path = dir.join("registry.jsonl");
        let store = Arc::new(JsonlFileStore::at(&path));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let source = format!("module {i}");
                store
                    .insert(
                        ContentHash::of_source(&source),
                        ModuleHandle::new(format!("rho:id:{i}")),
                    )
                    .await
            }));
        }
        for task in tasks {
            task.await.expect("task should join").expect("insert should succeed");
        }

        assert_eq!(JsonlFileStore::at(&path).load().await.unwrap().len(), 16);
        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn inserts_append_one_line_per_new_hash() {
        let dir = temp_path("append");
        let path = dir.join("registry.jsonl");
        let store = JsonlFileStore::at(&path);

        store
            .insert(ContentHash::of_source("a"), ModuleHandle::new("rho:id:a"))
            .await
            .unwrap();
        let first = fs::read_to_string(&path).unwrap();

        store
            .insert(ContentHash::of_source("b"), ModuleHandle::new("rho:id:b"))
            .await
            .unwrap();
        let kept = store
            .insert(ContentHash::of_source("a"), ModuleHandle::new("rho:id:other"))
            .await
            .unwrap();
        assert_eq!(kept.uri, "rho:id:a");

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&first));
        assert_eq!(text.lines().count(), 2);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn record_entry_holds_the_lock_until_the_line_is_written() {
        let dir = temp_path("record");
        let path = dir.join("registry.jsonl");
        let lock_path = registry_lock_path(&path);
        let hash = ContentHash::of_source("a");

        let guard = RegistryFileLockGuard::try_acquire(&lock_path)
            .unwrap()
            .expect("lock should be free");
        assert!(lock_path.exists());
        let recorded = record_entry(guard, &path, hash, ModuleHandle::new("rho:id:a")).unwrap();
        assert_eq!(recorded.uri, "rho:id:a");
        assert!(!lock_path.exists());
        assert_eq!(read_entries_from_path(&path).unwrap().len(), 1);

        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn aborted_insert_leaves_log_usable() {
        let dir = temp_path("aborted");
        let path = dir.join("registry.jsonl");
        let store = Arc::new(JsonlFileStore::at(&path));

        let pending = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .insert(ContentHash::of_source("a"), ModuleHandle::new("rho:id:a"))
                    .await
            })
        };
        tokio::task::yield_now().await;
        pending.abort();
        let _ = pending.await;

        store
            .insert(ContentHash::of_source("b"), ModuleHandle::new("rho:id:b"))
            .await
            .expect("insert after an aborted one should succeed");

        let all = store.load().await.unwrap();
        assert!(all.contains_key(&ContentHash::of_source("b")));
        assert!(all.len() <= 2);
        assert!(!registry_lock_path(&path).exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn busy_lock_times_out() {
        let dir = temp_path("busy");
        let path = dir.join("registry.jsonl");
        fs::create_dir_all(&dir).unwrap();
        fs::write(registry_lock_path(&path), "pid=0\n").unwrap();

        let store = JsonlFileStore::new(RegistryConfig {
            path: path.clone(),
            lock_retries: 2,
            lock_retry_delay_ms: 1,
        });
        let err = store
            .insert(ContentHash::of_source("x"), ModuleHandle::new("rho:id:x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LockBusy { .. }));
        assert!(!path.exists());

        let _ = fs::remove_dir_all(dir);
    }
}
