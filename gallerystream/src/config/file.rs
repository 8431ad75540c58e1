//! Typed view of `config.ini`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use super::keys::ConfigKey;
use super::{config_dir, config_file_path, ConfigError};
use crate::cache::{BlobCacheConfig, CACHE_VERSION};
use crate::fetch::DEFAULT_FETCH_TIMEOUT;
use crate::quality::QualityThresholds;
use crate::queue::{self, QueueConfig};
use crate::session::{StreamingConfig, DEFAULT_ERROR_LOG_COOLDOWN};
use crate::throttle::{MovementConfig, DEFAULT_MOVING_SPEED, DEFAULT_SETTLE_SPEED};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub directory: PathBuf,
    pub ttl_days: u64,
    pub version: String,
}

/// `[queues]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    pub thumbnail_concurrency: usize,
    pub thumbnail_moving_concurrency: usize,
    pub thumbnail_timeout_secs: u64,
    pub full_concurrency: usize,
    pub full_moving_concurrency: usize,
    pub full_timeout_secs: u64,
    pub watchdog_ms: u64,
}

/// `[quality]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySettings {
    pub thumb_upgrade: f32,
    pub high_eligible: f32,
    pub medium_downgrade: f32,
    pub high_downgrade: f32,
    pub check_interval_frames: u32,
}

/// `[movement]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementSettings {
    pub moving_speed: f32,
    pub settle_speed: f32,
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub error_log_cooldown_secs: u64,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
}

/// Complete configuration file contents.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub queues: QueueSettings,
    pub quality: QualitySettings,
    pub movement: MovementSettings,
    pub fetch: FetchSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let thresholds = QualityThresholds::default();
        let base = config_dir();
        Self {
            cache: CacheSettings {
                directory: base.join("cache"),
                ttl_days: crate::cache::DEFAULT_RETENTION.as_secs() / SECONDS_PER_DAY,
                version: CACHE_VERSION.to_string(),
            },
            queues: QueueSettings {
                thumbnail_concurrency: queue::DEFAULT_THUMBNAIL_CONCURRENCY,
                thumbnail_moving_concurrency: queue::DEFAULT_THUMBNAIL_MOVING_CONCURRENCY,
                thumbnail_timeout_secs: queue::DEFAULT_THUMBNAIL_TIMEOUT.as_secs(),
                full_concurrency: queue::DEFAULT_FULL_CONCURRENCY,
                full_moving_concurrency: queue::DEFAULT_FULL_MOVING_CONCURRENCY,
                full_timeout_secs: queue::DEFAULT_FULL_TIMEOUT.as_secs(),
                watchdog_ms: queue::DEFAULT_WATCHDOG_INTERVAL.as_millis() as u64,
            },
            quality: QualitySettings {
                thumb_upgrade: thresholds.thumb_upgrade,
                high_eligible: thresholds.high_eligible,
                medium_downgrade: thresholds.medium_downgrade,
                high_downgrade: thresholds.high_downgrade,
                check_interval_frames: thresholds.check_interval_frames,
            },
            movement: MovementSettings {
                moving_speed: DEFAULT_MOVING_SPEED,
                settle_speed: DEFAULT_SETTLE_SPEED,
            },
            fetch: FetchSettings {
                timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
                error_log_cooldown_secs: DEFAULT_ERROR_LOG_COOLDOWN.as_secs(),
            },
            logging: LoggingSettings {
                directory: base.join("logs"),
            },
        }
    }
}

impl ConfigFile {
    /// Loads the user's configuration file, or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads configuration from `path`. Missing keys take defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Saves to the user's configuration file.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Writes every setting to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini.write_to_file(path).map_err(write_error)
    }

    /// Builds a validated session configuration.
    pub fn to_streaming_config(&self) -> Result<StreamingConfig, ConfigError> {
        let watchdog_interval = Duration::from_millis(self.queues.watchdog_ms);
        let timeout = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

        let config = StreamingConfig {
            cache: BlobCacheConfig {
                retention: Duration::from_secs(self.cache.ttl_days * SECONDS_PER_DAY),
                version: self.cache.version.clone(),
            },
            thumbnail_queue: QueueConfig {
                name: "thumbnail".to_string(),
                concurrency: self.queues.thumbnail_concurrency,
                moving_concurrency: Some(self.queues.thumbnail_moving_concurrency),
                watchdog_interval,
                task_timeout: timeout(self.queues.thumbnail_timeout_secs),
            },
            full_queue: QueueConfig {
                name: "full".to_string(),
                concurrency: self.queues.full_concurrency,
                moving_concurrency: Some(self.queues.full_moving_concurrency),
                watchdog_interval,
                task_timeout: timeout(self.queues.full_timeout_secs),
            },
            quality: QualityThresholds {
                thumb_upgrade: self.quality.thumb_upgrade,
                high_eligible: self.quality.high_eligible,
                medium_downgrade: self.quality.medium_downgrade,
                high_downgrade: self.quality.high_downgrade,
                check_interval_frames: self.quality.check_interval_frames,
            },
            movement: MovementConfig {
                moving_speed: self.movement.moving_speed,
                settle_speed: self.movement.settle_speed,
            },
            error_log_cooldown: Duration::from_secs(self.fetch.error_log_cooldown_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// HTTP request timeout for the fetcher.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_library() {
        let config = ConfigFile::default();
        let streaming = config.to_streaming_config().unwrap();
        assert_eq!(streaming, StreamingConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.quality.thumb_upgrade = 40.0;
        config.queues.full_moving_concurrency = 2;
        config.cache.directory = PathBuf::from("/tmp/gallery-cache");
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[quality]\nthumb_upgrade = 45\n").unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.quality.thumb_upgrade, 45.0);
        assert_eq!(loaded.queues, ConfigFile::default().queues);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[queues]\nfull_concurrency = many\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "queues.full_concurrency"));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let mut config = ConfigFile::default();
        config.queues.full_timeout_secs = 0;
        let streaming = config.to_streaming_config().unwrap();
        assert_eq!(streaming.full_queue.task_timeout, None);
    }

    #[test]
    fn test_inconsistent_thresholds_fail_validation() {
        let mut config = ConfigFile::default();
        config.quality.medium_downgrade = 30.0;
        assert!(matches!(
            config.to_streaming_config(),
            Err(ConfigError::Invalid(_))
        ));
    }
}
