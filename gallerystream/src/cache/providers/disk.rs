//! On-disk entry store.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/VERSION                    schema version marker
//! <root>/entries/<sha256(key)>.bin  bincode-encoded CacheEntry
//! ```
//!
//! File names are derived from the key hash so arbitrary URLs map to safe,
//! fixed-length names. The decoded entry carries its key; a mismatch (hash
//! collision or foreign file) is treated as a miss.
//!
//! All filesystem work runs on tokio's blocking pool via `spawn_blocking`.
//! Writes go to a temporary file that is renamed into place, so a reader
//! never observes a partially written entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::entry::CacheEntry;
use crate::cache::traits::{BoxFuture, CacheError, EntryStore, StoreStats};

const ENTRIES_DIR: &str = "entries";
const VERSION_FILE: &str = "VERSION";
const ENTRY_EXTENSION: &str = "bin";

/// On-disk entry store with one file per entry.
pub struct DiskEntryStore {
    root: PathBuf,
    /// Distinguishes temporary files of concurrent writers.
    tmp_counter: Arc<AtomicU64>,
}

impl DiskEntryStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(root.join(ENTRIES_DIR))?;
        debug!(root = %root.display(), "Opened disk entry store");
        Ok(Self {
            root,
            tmp_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Returns the cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entries_dir(&self) -> PathBuf {
        self.root.join(ENTRIES_DIR)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.entries_dir()
            .join(format!("{:x}.{}", digest, ENTRY_EXTENSION))
    }

    fn version_path(&self) -> PathBuf {
        self.root.join(VERSION_FILE)
    }
}

/// Runs blocking filesystem work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, CacheError>
where
    F: FnOnce() -> Result<T, CacheError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CacheError::Provider(format!("blocking task failed: {}", e)))?
}

/// Writes `data` to `path` through a temporary sibling file.
fn write_atomic(path: &Path, data: &[u8], tmp_id: u64) -> Result<(), CacheError> {
    let tmp = path.with_extension(format!("tmp{}", tmp_id));
    std::fs::write(&tmp, data)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn is_entry_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION)
}

impl EntryStore for DiskEntryStore {
    fn name(&self) -> &str {
        "disk"
    }

    fn read(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
        let key = key.to_string();
        let path = self.entry_path(&key);
        Box::pin(async move {
            let data = blocking(move || match std::fs::read(&path) {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            })
            .await?;

            let Some(data) = data else {
                return Ok(None);
            };

            let entry = CacheEntry::decode(&data)?;
            if entry.key != key {
                warn!(key = %key, stored_key = %entry.key, "Disk entry key mismatch, ignoring");
                return Ok(None);
            }
            Ok(Some(entry))
        })
    }

    fn write(&self, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>> {
        let path = self.entry_path(&entry.key);
        let tmp_id = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move {
            let data = entry.encode()?;
            blocking(move || {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                write_atomic(&path, &data, tmp_id)
            })
            .await
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move {
            blocking(move || match std::fs::remove_file(&path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            })
            .await
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        let dir = self.entries_dir();
        Box::pin(async move {
            blocking(move || {
                match std::fs::remove_dir_all(&dir) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                std::fs::create_dir_all(&dir)?;
                Ok(())
            })
            .await
        })
    }

    fn read_version(&self) -> BoxFuture<'_, Result<Option<String>, CacheError>> {
        let path = self.version_path();
        Box::pin(async move {
            blocking(move || match std::fs::read_to_string(&path) {
                Ok(version) => Ok(Some(version.trim().to_string())),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            })
            .await
        })
    }

    fn write_version(&self, version: &str) -> BoxFuture<'_, Result<(), CacheError>> {
        let path = self.version_path();
        let version = version.to_string();
        let tmp_id = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move {
            blocking(move || write_atomic(&path, version.as_bytes(), tmp_id)).await
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<StoreStats, CacheError>> {
        let dir = self.entries_dir();
        Box::pin(async move {
            blocking(move || {
                let mut stats = StoreStats::default();
                let entries = match std::fs::read_dir(&dir) {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(stats),
                    Err(e) => return Err(e.into()),
                };
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !is_entry_file(&path) {
                        continue;
                    }
                    if let Ok(metadata) = entry.metadata() {
                        stats.entry_count += 1;
                        stats.size_bytes += metadata.len();
                    }
                }
                Ok(stats)
            })
            .await
        })
    }
}
