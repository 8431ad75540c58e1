//! Network fetch abstraction.
//!
//! The streaming core treats the network as a single dependency: give it a
//! URL, get back bytes or a [`FetchError`]. The persistent cache wraps it and
//! the load queues schedule it.
//!
//! ```ignore
//! use gallerystream::fetch::{Fetcher, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new()?;
//! let bytes = fetcher.fetch("https://cdn.example.com/plane-12/thumb.webp").await?;
//! ```

mod error;
mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use error::FetchError;
pub use http::{Fetcher, HttpFetcher, DEFAULT_FETCH_TIMEOUT};
