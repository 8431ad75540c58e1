//! Streaming session.
//!
//! A [`StreamingSession`] is the explicit owner of everything that lives as
//! long as a gallery is open: the blob cache, the fetcher, the thumbnail and
//! full-quality queues, the failed-URL registry and the movement throttle.
//! Nothing here is process-global, so two sessions (or two tests) never
//! share failure state.
//!
//! ```ignore
//! use std::sync::Arc;
//! use gallerystream::cache::DiskEntryStore;
//! use gallerystream::fetch::HttpFetcher;
//! use gallerystream::quality::AssetVariants;
//! use gallerystream::session::{StreamingConfig, StreamingSession};
//!
//! let session = StreamingSession::start(
//!     StreamingConfig::default(),
//!     Arc::new(DiskEntryStore::open(cache_dir)?),
//!     Arc::new(HttpFetcher::new()?),
//! )
//! .await?;
//!
//! let mut selector = session.selector(AssetVariants::tiered(thumb_url, medium_url));
//! ```

mod config;
mod failures;
#[allow(clippy::module_inception)]
mod session;

pub use config::StreamingConfig;
pub use failures::{FailureRegistry, DEFAULT_ERROR_LOG_COOLDOWN};
pub use session::{SessionError, SessionQueueStats, StreamingSession};
