//! Core traits for the persistent byte cache.
//!
//! The `EntryStore` trait is the storage seam under [`BlobCache`]: a
//! key-value interface over [`CacheEntry`] records plus a version marker.
//! Expiry, version checks and resource construction live in `BlobCache`;
//! stores only persist what they are given.
//!
//! # Design Principles
//!
//! - **String keys**: the source URL, human-readable in logs
//! - **Opaque payloads**: raw bytes, no decoding
//! - **Atomic per key**: concurrent writes to one key are last-writer-wins
//! - **Dyn-compatible**: uses `Pin<Box<dyn Future>>` for trait object support
//!
//! [`BlobCache`]: super::BlobCache

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use super::entry::CacheEntry;

/// Point-in-time size of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of entries currently stored (expired ones included until read).
    pub entry_count: u64,
    /// Total payload bytes.
    pub size_bytes: u64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entries, {} bytes", self.entry_count, self.size_bytes)
    }
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored entry could not be encoded or decoded.
    #[error("Cache entry codec error: {0}")]
    Codec(String),

    /// Persisting freshly fetched bytes failed.
    ///
    /// Never surfaced to `load_or_fetch` callers; logged and counted instead.
    #[error("Failed to persist {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    /// Provider-specific error.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Storage backend for cache entries.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; the cache is shared by every
/// load queue task.
pub trait EntryStore: Send + Sync {
    /// Short name for logs ("memory", "disk").
    fn name(&self) -> &str;

    /// Reads the entry stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is not present.
    fn read(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>>;

    /// Writes an entry, replacing any previous entry with the same key.
    fn write(&self, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Removes the entry under `key`.
    ///
    /// Returns `Ok(true)` if the key existed.
    fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>>;

    /// Removes every entry. The version marker is left alone.
    fn clear(&self) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Reads the stored schema version marker, if any.
    fn read_version(&self) -> BoxFuture<'_, Result<Option<String>, CacheError>>;

    /// Replaces the stored schema version marker.
    fn write_version(&self, version: &str) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Returns the current entry count and size.
    fn stats(&self) -> BoxFuture<'_, Result<StoreStats, CacheError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_stats_display() {
        let stats = StoreStats {
            entry_count: 3,
            size_bytes: 1024,
        };
        assert_eq!(stats.to_string(), "3 entries, 1024 bytes");
    }

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::WriteFailed {
            key: "https://cdn/t.webp".to_string(),
            reason: "disk full".to_string(),
        };
        assert!(err.to_string().contains("https://cdn/t.webp"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_cache_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cache_err: CacheError = io_err.into();
        assert!(matches!(cache_err, CacheError::Io(_)));
    }
}
