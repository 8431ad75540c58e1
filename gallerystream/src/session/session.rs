//! Lifetime-scoped streaming state.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::config::StreamingConfig;
use super::failures::FailureRegistry;
use crate::cache::{BlobCache, CacheError, EntryStore};
use crate::config::ConfigError;
use crate::fetch::{FetchError, Fetcher};
use crate::quality::{AssetVariants, QualitySelector, QualityTier};
use crate::queue::{LoadQueue, QueueStats};
use crate::resource::{DimensionError, Resource};
use crate::throttle::MovementThrottle;

/// Errors starting a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to open cache: {0}")]
    Cache(#[from] CacheError),
}

/// Queue snapshots of both tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionQueueStats {
    pub thumbnail: QueueStats,
    pub full: QueueStats,
}

/// Owns the cache, fetcher, both load queues, the failure registry and the
/// movement throttle for one streaming session.
///
/// Share it as `Arc<StreamingSession>`; every [`QualitySelector`] holds one.
pub struct StreamingSession {
    config: StreamingConfig,
    cache: BlobCache,
    fetcher: Arc<dyn Fetcher>,
    thumbnail_queue: LoadQueue,
    full_queue: LoadQueue,
    failures: FailureRegistry,
    throttle: MovementThrottle,
    runtime: Handle,
}

impl StreamingSession {
    /// Validates `config`, opens the cache over `store` and starts the queues.
    ///
    /// Must be called from within a Tokio runtime; queue tasks run on it.
    pub async fn start(
        config: StreamingConfig,
        store: Arc<dyn EntryStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Arc<Self>, SessionError> {
        config.validate()?;

        let store_name = store.name().to_string();
        let cache = BlobCache::open(store, config.cache.clone()).await?;
        let runtime = Handle::current();

        let thumbnail_queue = LoadQueue::start_on(config.thumbnail_queue.clone(), runtime.clone());
        let full_queue = LoadQueue::start_on(config.full_queue.clone(), runtime.clone());

        let throttle = MovementThrottle::new(config.movement)
            .bind(
                Arc::new(thumbnail_queue.clone()),
                thumbnail_queue.moving_concurrency(),
            )
            .bind(Arc::new(full_queue.clone()), full_queue.moving_concurrency());

        info!(
            store = %store_name,
            thumbnail_concurrency = config.thumbnail_queue.concurrency,
            full_concurrency = config.full_queue.concurrency,
            retention_days = config.cache.retention.as_secs() / 86_400,
            "Streaming session started"
        );

        Ok(Arc::new(Self {
            failures: FailureRegistry::new(config.error_log_cooldown),
            config,
            cache,
            fetcher,
            thumbnail_queue,
            full_queue,
            throttle,
            runtime,
        }))
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn cache(&self) -> &BlobCache {
        &self.cache
    }

    pub fn failures(&self) -> &FailureRegistry {
        &self.failures
    }

    /// Camera movement throttle bound to both queues.
    pub fn movement_throttle(&self) -> &MovementThrottle {
        &self.throttle
    }

    pub fn thumbnail_queue(&self) -> &LoadQueue {
        &self.thumbnail_queue
    }

    pub fn full_queue(&self) -> &LoadQueue {
        &self.full_queue
    }

    pub fn queue_stats(&self) -> SessionQueueStats {
        SessionQueueStats {
            thumbnail: self.thumbnail_queue.stats(),
            full: self.full_queue.stats(),
        }
    }

    /// Creates a selector for one displayed asset.
    pub fn selector(self: &Arc<Self>, variants: AssetVariants) -> QualitySelector {
        QualitySelector::new(Arc::clone(self), variants)
    }

    /// Spawns a task on the session runtime.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(future);
    }

    /// Loads `url` through the queue for `tier`.
    ///
    /// The work is submitted immediately; the returned future only waits
    /// for it. URLs that failed earlier in the session are rejected without
    /// being queued.
    pub fn load(
        self: &Arc<Self>,
        url: &str,
        tier: QualityTier,
    ) -> impl Future<Output = Result<Resource, FetchError>> + Send + 'static {
        let url = url.to_string();
        let session = Arc::clone(self);

        let handle = if self.failures.is_failed(&url) {
            debug!(url = %url, "Skipping previously failed URL");
            None
        } else {
            let queue = if tier.is_full_quality() {
                &self.full_queue
            } else {
                &self.thumbnail_queue
            };
            let worker = Arc::clone(self);
            let task_url = url.clone();
            Some(queue.submit(
                async move { worker.load_or_fetch(&task_url).await },
                tier.priority(),
            ))
        };

        async move {
            let Some(handle) = handle else {
                return Err(FetchError::PreviouslyFailed { url });
            };
            match handle.await {
                Ok(result) => result,
                Err(source) => {
                    let error = FetchError::Queue { url, source };
                    session.failures.record(&error);
                    Err(error)
                }
            }
        }
    }

    /// Fails `url` for the session and evicts its cached bytes so a later
    /// session refetches it.
    pub fn invalidate(&self, url: &str, error: &DimensionError) {
        self.failures.mark_invalid(url, error);
        self.cache.evict_in_background(url);
    }

    /// Loads `url` from the cache or network without queueing.
    pub async fn load_or_fetch(&self, url: &str) -> Result<Resource, FetchError> {
        if self.failures.is_failed(url) {
            return Err(FetchError::PreviouslyFailed {
                url: url.to_string(),
            });
        }

        let result = self.cache.load_or_fetch(url, self.fetcher.as_ref()).await;
        if let Err(error) = &result {
            self.failures.record(error);
        }
        result
    }

    /// Stops both queues and waits for pending cache writes.
    pub async fn shutdown(&self) {
        self.thumbnail_queue.shutdown();
        self.full_queue.shutdown();
        self.cache.flush().await;
        match self.cache.stats().await {
            Ok(stats) => info!(
                hits = stats.hits,
                misses = stats.misses,
                write_failures = stats.write_failures,
                failed_urls = self.failures.failed_count(),
                "Streaming session stopped"
            ),
            Err(e) => warn!(error = %e, "Streaming session stopped, cache stats unavailable"),
        }
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("thumbnail_queue", &self.thumbnail_queue)
            .field("full_queue", &self.full_queue)
            .field("failed_urls", &self.failures.failed_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryEntryStore;
    use crate::fetch::mock::MockFetcher;
    use bytes::Bytes;
    use std::time::Duration;

    async fn start(fetcher: Arc<MockFetcher>) -> Arc<StreamingSession> {
        StreamingSession::start(
            StreamingConfig::default(),
            Arc::new(MemoryEntryStore::default()),
            fetcher,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_routes_and_caches() {
        let fetcher = Arc::new(MockFetcher::new().with_response("t.webp", Bytes::from_static(b"t")));
        let session = start(fetcher.clone()).await;

        let first = session.load("t.webp", QualityTier::Thumbnail).await.unwrap();
        session.cache().flush().await;
        let second = session.load("t.webp", QualityTier::Thumbnail).await.unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(fetcher.calls("t.webp"), 1);

        let stats = session.queue_stats();
        assert_eq!(stats.thumbnail.completed, 2);
        assert_eq!(stats.full.completed, 0);
    }

    #[tokio::test]
    async fn test_failed_url_short_circuits() {
        let fetcher = Arc::new(MockFetcher::new().with_status("o.jpg", 500));
        let session = start(fetcher.clone()).await;

        let first = session.load("o.jpg", QualityTier::High).await.unwrap_err();
        assert_eq!(first.status(), Some(500));

        let second = session.load_or_fetch("o.jpg").await.unwrap_err();
        assert!(matches!(second, FetchError::PreviouslyFailed { .. }));

        let third = session.load("o.jpg", QualityTier::High).await.unwrap_err();
        assert!(matches!(third, FetchError::PreviouslyFailed { .. }));

        assert_eq!(fetcher.calls("o.jpg"), 1);
        assert_eq!(session.queue_stats().full.completed, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_recorded() {
        let fetcher = Arc::new(MockFetcher::new());
        let session = start(fetcher).await;

        let err = session.load_or_fetch("m.webp").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(session.failures().is_failed("m.webp"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_fetch_times_out_and_fails_url() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_image("o.jpg")
                .with_delay(Duration::from_secs(3600)),
        );
        let mut config = StreamingConfig::default();
        config.full_queue.task_timeout = Some(Duration::from_secs(2));
        let session = StreamingSession::start(
            config,
            Arc::new(MemoryEntryStore::default()),
            fetcher,
        )
        .await
        .unwrap();

        let err = session.load("o.jpg", QualityTier::High).await.unwrap_err();
        assert!(matches!(err, FetchError::Queue { .. }));
        assert!(session.failures().is_failed("o.jpg"));
        assert_eq!(session.queue_stats().full.timed_out, 1);
    }

    #[tokio::test]
    async fn test_invalidate_evicts_cached_bytes() {
        let fetcher = Arc::new(
            MockFetcher::new().with_response("t.webp", Bytes::from_static(b"<html>502</html>")),
        );
        let session = start(fetcher).await;

        let resource = session.load("t.webp", QualityTier::Thumbnail).await.unwrap();
        let error = resource.dimensions().unwrap_err();
        session.invalidate("t.webp", &error);
        session.cache().flush().await;

        assert!(session.failures().is_failed("t.webp"));
        assert!(session.cache().get("t.webp").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = StreamingConfig::default();
        config.quality.medium_downgrade = 1.0;
        let result = StreamingSession::start(
            config,
            Arc::new(MemoryEntryStore::default()),
            Arc::new(MockFetcher::new()),
        )
        .await;
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_loads() {
        let session = start(Arc::new(MockFetcher::new().with_image("t.webp"))).await;
        session.shutdown().await;

        let err = session.load("t.webp", QualityTier::Thumbnail).await.unwrap_err();
        assert!(matches!(err, FetchError::Queue { .. }));
        assert!(!session.failures().is_failed("t.webp"));
    }
}
