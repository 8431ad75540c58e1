//! Persistent byte cache.
//!
//! This module provides the byte cache that sits between the load queues and
//! the network. Entries are keyed by source URL, expire after a retention
//! window, and are wiped wholesale when the schema version changes.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ BlobCache                                      │
//! │   retention · version check · Resource handles │
//! │   background persists (TaskTracker)            │
//! └───────────────────────┬────────────────────────┘
//!                         │ Arc<dyn EntryStore>
//!            ┌────────────┴────────────┐
//!            ▼                         ▼
//!   ┌──────────────────┐      ┌──────────────────┐
//!   │ MemoryEntryStore │      │ DiskEntryStore   │
//!   │ (moka)           │      │ (one file/entry) │
//!   └──────────────────┘      └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gallerystream::cache::{BlobCache, BlobCacheConfig, MemoryEntryStore};
//!
//! let cache = BlobCache::open(Arc::new(MemoryEntryStore::default()), BlobCacheConfig::default()).await?;
//! let resource = cache.load_or_fetch(url, &fetcher).await?;
//! ```

mod blob;
mod clock;
mod entry;
mod providers;
mod traits;

pub use blob::{BlobCache, BlobCacheConfig, BlobCacheStats, CACHE_VERSION, DEFAULT_RETENTION};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use providers::{DiskEntryStore, MemoryEntryStore, DEFAULT_MEMORY_CAPACITY};
pub use traits::{BoxFuture, CacheError, EntryStore, StoreStats};
