//! Cache entry record and its on-disk encoding.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::traits::CacheError;

/// One cached payload, keyed by its source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Source URL.
    pub key: String,
    /// Raw fetched bytes.
    pub payload: Bytes,
    /// Wall-clock time the entry was written, in Unix milliseconds.
    pub stored_at_millis: i64,
    /// Payload length.
    pub size_bytes: u64,
}

#[derive(Serialize)]
struct EncodedEntryRef<'a> {
    key: &'a str,
    stored_at_millis: i64,
    size_bytes: u64,
    payload: &'a [u8],
}

#[derive(Deserialize)]
struct EncodedEntry {
    key: String,
    stored_at_millis: i64,
    size_bytes: u64,
    payload: Vec<u8>,
}

impl CacheEntry {
    /// Creates an entry stamped with `stored_at_millis`.
    pub fn new(key: impl Into<String>, payload: Bytes, stored_at_millis: i64) -> Self {
        let size_bytes = payload.len() as u64;
        Self {
            key: key.into(),
            payload,
            stored_at_millis,
            size_bytes,
        }
    }

    /// An entry is live while `stored_at + retention > now`.
    pub fn is_expired(&self, now_millis: i64, retention: Duration) -> bool {
        let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        self.stored_at_millis.saturating_add(retention_ms) <= now_millis
    }

    /// Encodes the entry with bincode.
    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        bincode::serialize(&EncodedEntryRef {
            key: &self.key,
            stored_at_millis: self.stored_at_millis,
            size_bytes: self.size_bytes,
            payload: &self.payload,
        })
        .map_err(|e| CacheError::Codec(e.to_string()))
    }

    /// Decodes an entry written by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        let encoded: EncodedEntry =
            bincode::deserialize(bytes).map_err(|e| CacheError::Codec(e.to_string()))?;

        if encoded.size_bytes != encoded.payload.len() as u64 {
            return Err(CacheError::Codec(format!(
                "size mismatch for {}: header says {} bytes, payload has {}",
                encoded.key,
                encoded.size_bytes,
                encoded.payload.len()
            )));
        }

        Ok(Self {
            key: encoded.key,
            payload: Bytes::from(encoded.payload),
            stored_at_millis: encoded.stored_at_millis,
            size_bytes: encoded.size_bytes,
        })
    }
}
