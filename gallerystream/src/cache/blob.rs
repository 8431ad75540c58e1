//! Versioned, expiring byte cache keyed by source URL.
//!
//! `BlobCache` layers the cache policy over an [`EntryStore`]:
//!
//! - entries older than the retention window are treated as absent and
//!   deleted on the read that discovers them
//! - the store's version marker is checked once at open; a mismatch wipes
//!   every entry
//! - every hit builds a fresh [`Resource`] handle
//! - `load_or_fetch` persists fetched bytes in the background and never
//!   fails because of the cache

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use super::clock::{Clock, SystemClock};
use super::entry::CacheEntry;
use super::traits::{CacheError, EntryStore};
use crate::fetch::{FetchError, Fetcher};
use crate::resource::Resource;

/// Default retention window (30 days).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Schema version written by this build.
///
/// Bump when the entry encoding changes; existing stores are wiped on open.
pub const CACHE_VERSION: &str = "gallerystream-v1";

/// Blob cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobCacheConfig {
    /// How long an entry stays valid after it was written.
    pub retention: Duration,
    /// Expected schema version marker.
    pub version: String,
}

impl Default for BlobCacheConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            version: CACHE_VERSION.to_string(),
        }
    }
}

/// Snapshot of cache size and counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobCacheStats {
    pub entry_count: u64,
    pub size_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    /// Entries removed because they outlived the retention window.
    pub expired_removed: u64,
    /// Background persists that failed.
    pub write_failures: u64,
}

impl BlobCacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_removed: AtomicU64,
    write_failures: AtomicU64,
}

/// Persistent byte cache with retention and version wipe.
pub struct BlobCache {
    store: Arc<dyn EntryStore>,
    clock: Arc<dyn Clock>,
    config: BlobCacheConfig,
    writes: TaskTracker,
    counters: Arc<Counters>,
    /// Orders background persists against evictions.
    sequence: Arc<AtomicU64>,
    /// Key to the sequence number of its latest eviction.
    evictions: Arc<DashMap<String, u64>>,
}

impl BlobCache {
    /// Opens the cache over `store`, wiping it if its version marker differs.
    pub async fn open(
        store: Arc<dyn EntryStore>,
        config: BlobCacheConfig,
    ) -> Result<Self, CacheError> {
        Self::open_with_clock(store, config, Arc::new(SystemClock)).await
    }

    /// Opens the cache with an explicit clock.
    pub async fn open_with_clock(
        store: Arc<dyn EntryStore>,
        config: BlobCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        match store.read_version().await? {
            Some(found) if found == config.version => {
                debug!(store = store.name(), version = %found, "Cache version matches");
            }
            found => {
                if let Some(found) = &found {
                    info!(
                        store = store.name(),
                        found = %found,
                        expected = %config.version,
                        "Cache version changed, wiping store"
                    );
                }
                store.clear().await?;
                store.write_version(&config.version).await?;
            }
        }

        Ok(Self {
            store,
            clock,
            config,
            writes: TaskTracker::new(),
            counters: Arc::new(Counters::default()),
            sequence: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(DashMap::new()),
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &BlobCacheConfig {
        &self.config
    }

    /// Returns a fresh handle to the cached bytes, if present and unexpired.
    ///
    /// An expired entry is deleted before `None` is returned.
    pub async fn get(&self, key: &str) -> Result<Option<Resource>, CacheError> {
        let Some(entry) = self.store.read(key).await? else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        if entry.is_expired(self.clock.now_millis(), self.config.retention) {
            debug!(key = %key, stored_at = entry.stored_at_millis, "Cache entry expired");
            self.store.remove(key).await?;
            self.counters.expired_removed.fetch_add(1, Ordering::Relaxed);
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        trace!(key = %key, bytes = entry.size_bytes, "Cache hit");
        Ok(Some(Resource::new(entry.key, entry.payload)))
    }

    /// Stores `bytes` under `key`, stamped with the current time.
    pub async fn put(&self, key: &str, bytes: Bytes) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, bytes, self.clock.now_millis());
        self.store.write(entry).await
    }

    /// Removes one entry. Returns true if it existed.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.store.remove(key).await
    }

    /// Removes `key` in the background.
    ///
    /// A background persist of `key` started before this call is discarded
    /// even if it completes afterwards. Persists started later are kept.
    /// [`flush`](Self::flush) waits for the removal.
    pub fn evict_in_background(&self, key: &str) {
        let evicted_at = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.evictions.insert(key.to_string(), evicted_at);

        let store = Arc::clone(&self.store);
        let key = key.to_string();
        self.writes.spawn(async move {
            match store.remove(&key).await {
                Ok(existed) => debug!(key = %key, existed, "Cache entry evicted"),
                Err(e) => warn!(key = %key, error = %e, "Cache eviction failed"),
            }
        });
    }

    /// Removes every entry. The version marker is kept.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store.clear().await
    }

    /// Returns the cached resource or fetches it.
    ///
    /// Cache read failures fall through to the fetcher. Fetched bytes are
    /// persisted in the background; a failed persist is logged and counted
    /// but the call still succeeds with the fetched bytes.
    pub async fn load_or_fetch(
        &self,
        key: &str,
        fetcher: &dyn Fetcher,
    ) -> Result<Resource, FetchError> {
        match self.get(key).await {
            Ok(Some(resource)) => return Ok(resource),
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, fetching from network");
            }
        }

        let bytes = fetcher.fetch(key).await?;
        self.persist_in_background(key, bytes.clone());
        Ok(Resource::new(key, bytes))
    }

    fn persist_in_background(&self, key: &str, bytes: Bytes) {
        let store = Arc::clone(&self.store);
        let counters = Arc::clone(&self.counters);
        let evictions = Arc::clone(&self.evictions);
        let started_at = self.sequence.fetch_add(1, Ordering::SeqCst);
        let entry = CacheEntry::new(key, bytes, self.clock.now_millis());

        self.writes.spawn(async move {
            let key = entry.key.clone();
            if let Err(e) = store.write(entry).await {
                counters.write_failures.fetch_add(1, Ordering::Relaxed);
                let error = CacheError::WriteFailed {
                    key,
                    reason: e.to_string(),
                };
                warn!(error = %error, "Cache write failed");
                return;
            }

            // Checked after the write so an eviction racing it still wins
            let evicted = evictions
                .get(&key)
                .is_some_and(|evicted_at| *evicted_at > started_at);
            if evicted {
                debug!(key = %key, "Discarding persist of evicted entry");
                if let Err(e) = store.remove(&key).await {
                    warn!(key = %key, error = %e, "Cache eviction failed");
                }
            }
        });
    }

    /// Waits until every background persist started so far has finished.
    pub async fn flush(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }

    /// Number of background persists still running.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Returns store size and lookup counters.
    pub async fn stats(&self) -> Result<BlobCacheStats, CacheError> {
        let store = self.store.stats().await?;
        Ok(BlobCacheStats {
            entry_count: store.entry_count,
            size_bytes: store.size_bytes,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expired_removed: self.counters.expired_removed.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::traits::{BoxFuture, StoreStats};
    use crate::cache::MemoryEntryStore;
    use crate::fetch::mock::MockFetcher;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    async fn cache_with_clock() -> (BlobCache, Arc<ManualClock>, Arc<MemoryEntryStore>) {
        let store = Arc::new(MemoryEntryStore::default());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = BlobCache::open_with_clock(
            store.clone(),
            BlobCacheConfig::default(),
            clock.clone(),
        )
        .await
        .unwrap();
        (cache, clock, store)
    }

    /// Store whose writes always fail.
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemoryEntryStore,
    }

    impl EntryStore for ReadOnlyStore {
        fn name(&self) -> &str {
            "read-only"
        }
        fn read(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
            self.inner.read(key)
        }
        fn write(&self, _entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>> {
            Box::pin(async { Err(CacheError::Provider("read-only".to_string())) })
        }
        fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
            self.inner.remove(key)
        }
        fn clear(&self) -> BoxFuture<'_, Result<(), CacheError>> {
            self.inner.clear()
        }
        fn read_version(&self) -> BoxFuture<'_, Result<Option<String>, CacheError>> {
            self.inner.read_version()
        }
        fn write_version(&self, version: &str) -> BoxFuture<'_, Result<(), CacheError>> {
            self.inner.write_version(version)
        }
        fn stats(&self) -> BoxFuture<'_, Result<StoreStats, CacheError>> {
            self.inner.stats()
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (cache, _clock, _store) = cache_with_clock().await;
        cache
            .put("https://cdn/t.webp", Bytes::from_static(b"thumb"))
            .await
            .unwrap();

        let resource = cache.get("https://cdn/t.webp").await.unwrap().unwrap();
        assert_eq!(resource.bytes().unwrap().as_ref(), b"thumb");
        assert_eq!(resource.source(), "https://cdn/t.webp");
    }

    #[tokio::test]
    async fn test_get_returns_distinct_handles() {
        let (cache, _clock, _store) = cache_with_clock().await;
        cache.put("k", Bytes::from_static(b"v")).await.unwrap();

        let mut first = cache.get("k").await.unwrap().unwrap();
        let second = cache.get("k").await.unwrap().unwrap();
        assert_ne!(first.id(), second.id());

        first.release();
        assert!(!second.is_released());
        assert!(cache.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed() {
        let (cache, clock, _store) = cache_with_clock().await;
        cache.put("k", Bytes::from_static(b"old")).await.unwrap();

        clock.advance(29 * DAY);
        assert!(cache.get("k").await.unwrap().is_some());

        clock.advance(DAY);
        assert!(cache.get("k").await.unwrap().is_none());

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.expired_removed, 1);
    }

    #[tokio::test]
    async fn test_put_replaces_and_restamps() {
        let (cache, clock, _store) = cache_with_clock().await;
        cache.put("k", Bytes::from_static(b"one")).await.unwrap();
        clock.advance(20 * DAY);
        cache.put("k", Bytes::from_static(b"two")).await.unwrap();
        clock.advance(20 * DAY);

        let resource = cache.get("k").await.unwrap().unwrap();
        assert_eq!(resource.bytes().unwrap().as_ref(), b"two");
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (cache, _clock, _store) = cache_with_clock().await;
        cache.put("a", Bytes::from_static(b"1")).await.unwrap();
        cache.put("b", Bytes::from_static(b"2")).await.unwrap();

        assert!(cache.delete("a").await.unwrap());
        assert!(!cache.delete("a").await.unwrap());
        assert!(cache.get("a").await.unwrap().is_none());

        cache.clear().await.unwrap();
        assert!(cache.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_mismatch_wipes_store() {
        let store = Arc::new(MemoryEntryStore::default());
        store.write_version("gallerystream-v0").await.unwrap();
        store
            .write(CacheEntry::new("k", Bytes::from_static(b"stale"), 0))
            .await
            .unwrap();

        let cache = BlobCache::open(store.clone(), BlobCacheConfig::default())
            .await
            .unwrap();

        assert!(cache.get("k").await.unwrap().is_none());
        assert_eq!(
            store.read_version().await.unwrap().as_deref(),
            Some(CACHE_VERSION)
        );
    }

    #[tokio::test]
    async fn test_matching_version_keeps_entries() {
        let store = Arc::new(MemoryEntryStore::default());
        store.write_version(CACHE_VERSION).await.unwrap();
        let now = SystemClock.now_millis();
        store
            .write(CacheEntry::new("k", Bytes::from_static(b"kept"), now))
            .await
            .unwrap();

        let cache = BlobCache::open(store, BlobCacheConfig::default())
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_load_or_fetch_persists() {
        let (cache, _clock, _store) = cache_with_clock().await;
        let fetcher = MockFetcher::new().with_response("u", Bytes::from_static(b"net"));

        let first = cache.load_or_fetch("u", &fetcher).await.unwrap();
        assert_eq!(first.bytes().unwrap().as_ref(), b"net");
        cache.flush().await;

        let second = cache.load_or_fetch("u", &fetcher).await.unwrap();
        assert_eq!(second.bytes().unwrap().as_ref(), b"net");
        assert_eq!(fetcher.calls("u"), 1);
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_load_or_fetch_reports_not_found() {
        let (cache, _clock, _store) = cache_with_clock().await;
        let fetcher = MockFetcher::new().with_status("m.webp", 404);

        let err = cache.load_or_fetch("m.webp", &fetcher).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_evict_discards_in_flight_persist() {
        let (cache, _clock, _store) = cache_with_clock().await;
        let fetcher = MockFetcher::new().with_response("u", Bytes::from_static(b"bad"));

        cache.load_or_fetch("u", &fetcher).await.unwrap();
        cache.evict_in_background("u");
        cache.flush().await;
        assert!(cache.get("u").await.unwrap().is_none());

        // A persist started after the eviction is kept
        cache.load_or_fetch("u", &fetcher).await.unwrap();
        cache.flush().await;
        assert!(cache.get("u").await.unwrap().is_some());
        assert_eq!(fetcher.calls("u"), 2);
    }

    #[tokio::test]
    async fn test_evict_removes_stored_entry() {
        let (cache, _clock, store) = cache_with_clock().await;
        cache.put("k", Bytes::from_static(b"v")).await.unwrap();

        cache.evict_in_background("k");
        cache.flush().await;
        assert!(store.read("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_failure_does_not_fail_load() {
        let store = Arc::new(ReadOnlyStore::default());
        let cache = BlobCache::open(store, BlobCacheConfig::default())
            .await
            .unwrap();
        let fetcher = MockFetcher::new().with_response("u", Bytes::from_static(b"net"));

        let resource = cache.load_or_fetch("u", &fetcher).await.unwrap();
        assert_eq!(resource.bytes().unwrap().as_ref(), b"net");

        cache.flush().await;
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.write_failures, 1);
        assert_eq!(cache.pending_writes(), 0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = BlobCacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(BlobCacheStats::default().hit_rate(), 0.0);
    }
}
