//! Caller-owned handles to fetched image bytes.
//!
//! A [`Resource`] is what the streaming core hands to the scene renderer.
//! Every handle is distinct: loading the same URL twice (from the network or
//! from the cache) produces two handles with different ids, and releasing one
//! never invalidates the other. The bytes themselves are reference counted,
//! so distinct handles to the same payload are cheap.

use std::fmt;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

/// Global counter for resource ids.
static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a resource handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// A fetched image could not be displayed because its intrinsic size is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionError {
    /// The handle was released before its dimensions were read.
    #[error("resource for {url} has been released")]
    Released { url: String },

    /// The bytes are not a decodable image.
    #[error("unable to read image dimensions for {url}: {reason}")]
    Undecodable { url: String, reason: String },

    /// The image decoded but has a zero-sized edge.
    #[error("invalid image dimensions {width}×{height} for {url}")]
    Empty {
        url: String,
        width: u32,
        height: u32,
    },
}

/// An opaque, revocable handle to image bytes.
pub struct Resource {
    id: ResourceId,
    source: Arc<str>,
    bytes: Option<Bytes>,
}

impl Resource {
    /// Creates a new handle for bytes loaded from `source`.
    pub fn new(source: impl Into<Arc<str>>, bytes: Bytes) -> Self {
        Self {
            id: ResourceId::next(),
            source: source.into(),
            bytes: Some(bytes),
        }
    }

    /// Returns the unique id of this handle.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Returns the URL this resource was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the bytes, or `None` once the handle has been released.
    pub fn bytes(&self) -> Option<&Bytes> {
        self.bytes.as_ref()
    }

    /// Number of payload bytes held (0 once released).
    pub fn len(&self) -> usize {
        self.bytes.as_ref().map_or(0, Bytes::len)
    }

    /// Returns true if the handle holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once [`release`](Self::release) has been called.
    pub fn is_released(&self) -> bool {
        self.bytes.is_none()
    }

    /// Releases this handle's reference to the bytes.
    ///
    /// Other handles to the same payload are unaffected.
    pub fn release(&mut self) {
        if self.bytes.take().is_some() {
            tracing::trace!(resource = %self.id, source = %self.source, "Resource released");
        }
    }

    /// Reads the intrinsic image size from the encoded header.
    ///
    /// Only the header is parsed; pixel data is not decoded.
    pub fn dimensions(&self) -> Result<(u32, u32), DimensionError> {
        let bytes = self.bytes.as_ref().ok_or_else(|| DimensionError::Released {
            url: self.source.to_string(),
        })?;

        let undecodable = |reason: String| DimensionError::Undecodable {
            url: self.source.to_string(),
            reason,
        };

        let (width, height) = image::ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .map_err(|e| undecodable(e.to_string()))?
            .into_dimensions()
            .map_err(|e| undecodable(e.to_string()))?;

        if width == 0 || height == 0 {
            return Err(DimensionError::Empty {
                url: self.source.to_string(),
                width,
                height,
            });
        }

        Ok((width, height))
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("len", &self.len())
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::png_bytes;

    #[test]
    fn test_handles_are_distinct() {
        let payload = Bytes::from_static(b"shared");
        let a = Resource::new("https://cdn/a.webp", payload.clone());
        let b = Resource::new("https://cdn/a.webp", payload);

        assert_ne!(a.id(), b.id());
        assert_eq!(a.bytes(), b.bytes());
    }

    #[test]
    fn test_release_does_not_affect_other_handles() {
        let payload = Bytes::from_static(b"shared");
        let mut a = Resource::new("u", payload.clone());
        let b = Resource::new("u", payload);

        a.release();

        assert!(a.is_released());
        assert_eq!(a.len(), 0);
        assert!(!b.is_released());
        assert_eq!(b.bytes().map(|b| b.as_ref()), Some(&b"shared"[..]));
    }

    #[test]
    fn test_dimensions_of_png() {
        let resource = Resource::new("thumb.png", png_bytes(8, 4));
        assert_eq!(resource.dimensions(), Ok((8, 4)));
    }

    #[test]
    fn test_dimensions_of_garbage() {
        let resource = Resource::new("broken.webp", Bytes::from_static(b"not an image"));
        assert!(matches!(
            resource.dimensions(),
            Err(DimensionError::Undecodable { .. })
        ));
    }

    #[test]
    fn test_dimensions_after_release() {
        let mut resource = Resource::new("thumb.png", png_bytes(2, 2));
        resource.release();
        assert!(matches!(
            resource.dimensions(),
            Err(DimensionError::Released { .. })
        ));
    }

    #[test]
    fn test_resource_id_display() {
        let resource = Resource::new("u", Bytes::new());
        assert!(resource.id().to_string().starts_with("res#"));
        assert!(resource.is_empty());
    }
}
