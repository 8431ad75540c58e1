//! Streaming session configuration.

use std::time::Duration;

use crate::cache::BlobCacheConfig;
use crate::config::ConfigError;
use crate::quality::QualityThresholds;
use crate::queue::QueueConfig;
use crate::throttle::MovementConfig;

use super::failures::DEFAULT_ERROR_LOG_COOLDOWN;

/// Everything a [`StreamingSession`](super::StreamingSession) needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    pub cache: BlobCacheConfig,
    pub thumbnail_queue: QueueConfig,
    pub full_queue: QueueConfig,
    pub quality: QualityThresholds,
    pub movement: MovementConfig,
    /// Per-URL cooldown between warn-level fetch error logs.
    pub error_log_cooldown: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            cache: BlobCacheConfig::default(),
            thumbnail_queue: QueueConfig::thumbnail(),
            full_queue: QueueConfig::full_quality(),
            quality: QualityThresholds::default(),
            movement: MovementConfig::default(),
            error_log_cooldown: DEFAULT_ERROR_LOG_COOLDOWN,
        }
    }
}

impl StreamingConfig {
    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.quality.validate()?;

        if !self.movement.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "movement.settle_speed ({}) must be below movement.moving_speed ({})",
                self.movement.settle_speed, self.movement.moving_speed
            )));
        }

        for queue in [&self.thumbnail_queue, &self.full_queue] {
            if queue.concurrency == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} queue concurrency must be at least 1",
                    queue.name
                )));
            }
            if queue.moving_concurrency == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{} queue moving concurrency must be at least 1",
                    queue.name
                )));
            }
            if queue.watchdog_interval.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "{} queue watchdog interval must be positive",
                    queue.name
                )));
            }
        }

        if self.cache.retention.is_zero() {
            return Err(ConfigError::Invalid(
                "cache.ttl_days must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(StreamingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = StreamingConfig::default();
        config.full_queue.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("full"));
    }

    #[test]
    fn test_rejects_inverted_movement_band() {
        let config = StreamingConfig {
            movement: MovementConfig {
                moving_speed: 1.0,
                settle_speed: 2.0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
