//! Fetcher trait and HTTP implementation.

use std::time::Duration;

use bytes::Bytes;

use super::error::FetchError;
use crate::cache::BoxFuture;

/// Default request timeout for [`HttpFetcher`].
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for fetching raw bytes by URL.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock fetchers in tests. It uses boxed futures so it can be
/// held as `Arc<dyn Fetcher>`.
pub trait Fetcher: Send + Sync {
    /// Fetches the body at `url`.
    ///
    /// Non-success statuses must be reported as [`FetchError::Status`] so
    /// callers can tell a missing variant from a broken server.
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, FetchError>>;
}

/// Real fetcher implementation using reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Creates a fetcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response =
                self.client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| FetchError::Transport {
                        url: url.clone(),
                        message: e.to_string(),
                    })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                });
            }

            response.bytes().await.map_err(|e| FetchError::Transport {
                url,
                message: format!("Failed to read response: {}", e),
            })
        })
    }
}
