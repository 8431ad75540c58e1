//! In-memory entry store using moka.
//!
//! This store wraps `moka::future::Cache` to provide an async-safe,
//! size-bounded store. It backs tests and ephemeral sessions that do not
//! want anything left on disk.
//!
//! Moka evicts entries by weight (payload bytes) once the configured
//! capacity is exceeded. Retention is not delegated to moka: the blob cache
//! applies its own expiry on read so both stores behave the same.

use std::sync::Arc;

use moka::future::Cache as MokaCache;
use parking_lot::Mutex;

use crate::cache::entry::CacheEntry;
use crate::cache::traits::{BoxFuture, CacheError, EntryStore, StoreStats};

/// Default capacity for [`MemoryEntryStore::default`] (256 MB).
pub const DEFAULT_MEMORY_CAPACITY: u64 = 256 * 1024 * 1024;

/// In-memory entry store using moka.
pub struct MemoryEntryStore {
    /// The underlying moka cache.
    entries: MokaCache<String, Arc<CacheEntry>>,

    /// Schema version marker.
    version: Mutex<Option<String>>,
}

impl MemoryEntryStore {
    /// Create a new memory store bounded to `max_size_bytes` of payload.
    pub fn new(max_size_bytes: u64) -> Self {
        let entries = MokaCache::builder()
            // Weight each entry by its payload size
            .weigher(|_key: &String, entry: &Arc<CacheEntry>| -> u32 {
                // moka uses u32 for weights, cap at u32::MAX for very large entries
                entry.payload.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            entries,
            version: Mutex::new(None),
        }
    }
}

impl Default for MemoryEntryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl EntryStore for MemoryEntryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(self
                .entries
                .get(&key)
                .await
                .map(|entry| CacheEntry::clone(&entry)))
        })
    }

    fn write(&self, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>> {
        Box::pin(async move {
            self.entries.insert(entry.key.clone(), Arc::new(entry)).await;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.entries.remove(&key).await.is_some()) })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        Box::pin(async move {
            self.entries.invalidate_all();
            self.entries.run_pending_tasks().await;
            Ok(())
        })
    }

    fn read_version(&self) -> BoxFuture<'_, Result<Option<String>, CacheError>> {
        Box::pin(async move { Ok(self.version.lock().clone()) })
    }

    fn write_version(&self, version: &str) -> BoxFuture<'_, Result<(), CacheError>> {
        let version = version.to_string();
        Box::pin(async move {
            *self.version.lock() = Some(version);
            Ok(())
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<StoreStats, CacheError>> {
        Box::pin(async move {
            // Counters are only exact after pending maintenance has run
            self.entries.run_pending_tasks().await;
            Ok(StoreStats {
                entry_count: self.entries.entry_count(),
                size_bytes: self.entries.weighted_size(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn entry(key: &str, payload: &'static [u8]) -> CacheEntry {
        CacheEntry::new(key, Bytes::from_static(payload), 1_000)
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let store = MemoryEntryStore::new(1024 * 1024);
        store.write(entry("a", b"alpha")).await.unwrap();

        let read = store.read("a").await.unwrap().unwrap();
        assert_eq!(read.payload.as_ref(), b"alpha");
        assert_eq!(read.stored_at_millis, 1_000);
        assert!(store.read("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_replaces() {
        let store = MemoryEntryStore::default();
        store.write(entry("a", b"one")).await.unwrap();
        store.write(entry("a", b"two")).await.unwrap();

        let read = store.read("a").await.unwrap().unwrap();
        assert_eq!(read.payload.as_ref(), b"two");
    }

    #[tokio::test]
    async fn test_remove_reports_existence() {
        let store = MemoryEntryStore::default();
        store.write(entry("a", b"alpha")).await.unwrap();

        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert!(store.read("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_keeps_version() {
        let store = MemoryEntryStore::default();
        store.write_version("v1").await.unwrap();
        store.write(entry("a", b"alpha")).await.unwrap();
        store.write(entry("b", b"beta")).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.read("a").await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().entry_count, 0);
        assert_eq!(store.read_version().await.unwrap().as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryEntryStore::default();
        store.write(entry("a", b"12345")).await.unwrap();
        store.write(entry("b", b"123")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.size_bytes, 8);
    }
}
