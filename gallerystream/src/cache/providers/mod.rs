//! Entry store implementations.
//!
//! # Available Stores
//!
//! - [`MemoryEntryStore`]: size-bounded in-memory store using moka
//! - [`DiskEntryStore`]: one file per entry under a cache directory
//!
//! Stores are handed to [`BlobCache::open`](crate::cache::BlobCache::open)
//! as `Arc<dyn EntryStore>`:
//!
//! ```ignore
//! use std::sync::Arc;
//! use gallerystream::cache::{BlobCache, BlobCacheConfig, DiskEntryStore};
//!
//! let store = Arc::new(DiskEntryStore::open("/var/cache/gallerystream")?);
//! let cache = BlobCache::open(store, BlobCacheConfig::default()).await?;
//! ```

mod disk;
mod memory;

pub use disk::DiskEntryStore;
pub use memory::{MemoryEntryStore, DEFAULT_MEMORY_CAPACITY};
