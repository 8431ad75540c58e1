//! Test doubles for the fetch layer.

use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;

use super::{FetchError, Fetcher};
use crate::cache::BoxFuture;

/// Encodes a blank PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Bytes {
    let image = image::RgbaImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode test png");
    Bytes::from(out.into_inner())
}

/// Mock fetcher serving canned responses and counting calls.
///
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    responses: DashMap<String, Result<Bytes, FetchError>>,
    calls: DashMap<String, usize>,
    delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: &str, bytes: Bytes) -> Self {
        self.responses.insert(url.to_string(), Ok(bytes));
        self
    }

    pub fn with_image(self, url: &str) -> Self {
        self.with_response(url, png_bytes(4, 4))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.responses.insert(
            url.to_string(),
            Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.get(url).map_or(0, |c| *c)
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            *self.calls.entry(url.clone()).or_insert(0) += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.responses.get(&url) {
                Some(response) => response.value().clone(),
                None => Err(FetchError::Status { url, status: 404 }),
            }
        })
    }
}
