//! Named access to individual configuration settings.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ConfigFile};

/// A single `section.key` setting in `config.ini`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    CacheDirectory,
    CacheTtlDays,
    CacheVersion,

    QueuesThumbnailConcurrency,
    QueuesThumbnailMovingConcurrency,
    QueuesThumbnailTimeoutSecs,
    QueuesFullConcurrency,
    QueuesFullMovingConcurrency,
    QueuesFullTimeoutSecs,
    QueuesWatchdogMs,

    QualityThumbUpgrade,
    QualityHighEligible,
    QualityMediumDowngrade,
    QualityHighDowngrade,
    QualityCheckIntervalFrames,

    MovementMovingSpeed,
    MovementSettleSpeed,

    FetchTimeoutSecs,
    FetchErrorLogCooldownSecs,

    LoggingDirectory,
}

const ALL_KEYS: [ConfigKey; 20] = [
    ConfigKey::CacheDirectory,
    ConfigKey::CacheTtlDays,
    ConfigKey::CacheVersion,
    ConfigKey::QueuesThumbnailConcurrency,
    ConfigKey::QueuesThumbnailMovingConcurrency,
    ConfigKey::QueuesThumbnailTimeoutSecs,
    ConfigKey::QueuesFullConcurrency,
    ConfigKey::QueuesFullMovingConcurrency,
    ConfigKey::QueuesFullTimeoutSecs,
    ConfigKey::QueuesWatchdogMs,
    ConfigKey::QualityThumbUpgrade,
    ConfigKey::QualityHighEligible,
    ConfigKey::QualityMediumDowngrade,
    ConfigKey::QualityHighDowngrade,
    ConfigKey::QualityCheckIntervalFrames,
    ConfigKey::MovementMovingSpeed,
    ConfigKey::MovementSettleSpeed,
    ConfigKey::FetchTimeoutSecs,
    ConfigKey::FetchErrorLogCooldownSecs,
    ConfigKey::LoggingDirectory,
];

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// INI section the key lives in.
    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            CacheDirectory | CacheTtlDays | CacheVersion => "cache",
            QueuesThumbnailConcurrency
            | QueuesThumbnailMovingConcurrency
            | QueuesThumbnailTimeoutSecs
            | QueuesFullConcurrency
            | QueuesFullMovingConcurrency
            | QueuesFullTimeoutSecs
            | QueuesWatchdogMs => "queues",
            QualityThumbUpgrade
            | QualityHighEligible
            | QualityMediumDowngrade
            | QualityHighDowngrade
            | QualityCheckIntervalFrames => "quality",
            MovementMovingSpeed | MovementSettleSpeed => "movement",
            FetchTimeoutSecs | FetchErrorLogCooldownSecs => "fetch",
            LoggingDirectory => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            CacheDirectory => "directory",
            CacheTtlDays => "ttl_days",
            CacheVersion => "version",
            QueuesThumbnailConcurrency => "thumbnail_concurrency",
            QueuesThumbnailMovingConcurrency => "thumbnail_moving_concurrency",
            QueuesThumbnailTimeoutSecs => "thumbnail_timeout_secs",
            QueuesFullConcurrency => "full_concurrency",
            QueuesFullMovingConcurrency => "full_moving_concurrency",
            QueuesFullTimeoutSecs => "full_timeout_secs",
            QueuesWatchdogMs => "watchdog_ms",
            QualityThumbUpgrade => "thumb_upgrade",
            QualityHighEligible => "high_eligible",
            QualityMediumDowngrade => "medium_downgrade",
            QualityHighDowngrade => "high_downgrade",
            QualityCheckIntervalFrames => "check_interval_frames",
            MovementMovingSpeed => "moving_speed",
            MovementSettleSpeed => "settle_speed",
            FetchTimeoutSecs => "timeout_secs",
            FetchErrorLogCooldownSecs => "error_log_cooldown_secs",
            LoggingDirectory => "directory",
        }
    }

    /// Full dotted name, e.g. `quality.thumb_upgrade`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value rendered as it would appear in the file.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        match self {
            CacheDirectory => config.cache.directory.display().to_string(),
            CacheTtlDays => config.cache.ttl_days.to_string(),
            CacheVersion => config.cache.version.clone(),
            QueuesThumbnailConcurrency => config.queues.thumbnail_concurrency.to_string(),
            QueuesThumbnailMovingConcurrency => {
                config.queues.thumbnail_moving_concurrency.to_string()
            }
            QueuesThumbnailTimeoutSecs => config.queues.thumbnail_timeout_secs.to_string(),
            QueuesFullConcurrency => config.queues.full_concurrency.to_string(),
            QueuesFullMovingConcurrency => config.queues.full_moving_concurrency.to_string(),
            QueuesFullTimeoutSecs => config.queues.full_timeout_secs.to_string(),
            QueuesWatchdogMs => config.queues.watchdog_ms.to_string(),
            QualityThumbUpgrade => config.quality.thumb_upgrade.to_string(),
            QualityHighEligible => config.quality.high_eligible.to_string(),
            QualityMediumDowngrade => config.quality.medium_downgrade.to_string(),
            QualityHighDowngrade => config.quality.high_downgrade.to_string(),
            QualityCheckIntervalFrames => config.quality.check_interval_frames.to_string(),
            MovementMovingSpeed => config.movement.moving_speed.to_string(),
            MovementSettleSpeed => config.movement.settle_speed.to_string(),
            FetchTimeoutSecs => config.fetch.timeout_secs.to_string(),
            FetchErrorLogCooldownSecs => config.fetch.error_log_cooldown_secs.to_string(),
            LoggingDirectory => config.logging.directory.display().to_string(),
        }
    }

    /// Parses `value` and stores it in `config`.
    ///
    /// Only the value's syntax is checked here; cross-field constraints are
    /// enforced by [`ConfigFile::to_streaming_config`].
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        match self {
            CacheDirectory => config.cache.directory = self.parse_path(value)?,
            CacheTtlDays => config.cache.ttl_days = self.parse(value)?,
            CacheVersion => {
                if value.is_empty() {
                    return Err(self.invalid(value, "must not be empty"));
                }
                config.cache.version = value.to_string();
            }
            QueuesThumbnailConcurrency => config.queues.thumbnail_concurrency = self.parse(value)?,
            QueuesThumbnailMovingConcurrency => {
                config.queues.thumbnail_moving_concurrency = self.parse(value)?
            }
            QueuesThumbnailTimeoutSecs => {
                config.queues.thumbnail_timeout_secs = self.parse(value)?
            }
            QueuesFullConcurrency => config.queues.full_concurrency = self.parse(value)?,
            QueuesFullMovingConcurrency => {
                config.queues.full_moving_concurrency = self.parse(value)?
            }
            QueuesFullTimeoutSecs => config.queues.full_timeout_secs = self.parse(value)?,
            QueuesWatchdogMs => config.queues.watchdog_ms = self.parse(value)?,
            QualityThumbUpgrade => config.quality.thumb_upgrade = self.parse_distance(value)?,
            QualityHighEligible => config.quality.high_eligible = self.parse_distance(value)?,
            QualityMediumDowngrade => {
                config.quality.medium_downgrade = self.parse_distance(value)?
            }
            QualityHighDowngrade => config.quality.high_downgrade = self.parse_distance(value)?,
            QualityCheckIntervalFrames => {
                config.quality.check_interval_frames = self.parse(value)?
            }
            MovementMovingSpeed => config.movement.moving_speed = self.parse_distance(value)?,
            MovementSettleSpeed => config.movement.settle_speed = self.parse_distance(value)?,
            FetchTimeoutSecs => config.fetch.timeout_secs = self.parse(value)?,
            FetchErrorLogCooldownSecs => {
                config.fetch.error_log_cooldown_secs = self.parse(value)?
            }
            LoggingDirectory => config.logging.directory = self.parse_path(value)?,
        }
        Ok(())
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        value
            .parse()
            .map_err(|e: T::Err| self.invalid(value, &e.to_string()))
    }

    /// Non-negative finite float.
    fn parse_distance(&self, value: &str) -> Result<f32, ConfigError> {
        let parsed: f32 = self.parse(value)?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(self.invalid(value, "must be a non-negative number"));
        }
        Ok(parsed)
    }

    fn parse_path(&self, value: &str) -> Result<PathBuf, ConfigError> {
        if value.is_empty() {
            return Err(self.invalid(value, "must not be empty"));
        }
        if let Some(rest) = value.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return Ok(home.join(rest));
            }
        }
        Ok(PathBuf::from(value))
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_known_keys() {
        assert_eq!(
            "quality.thumb_upgrade".parse::<ConfigKey>().unwrap(),
            ConfigKey::QualityThumbUpgrade
        );
        assert_eq!(
            "Cache.Directory".parse::<ConfigKey>().unwrap(),
            ConfigKey::CacheDirectory
        );
        assert_eq!(
            "logging.directory".parse::<ConfigKey>().unwrap(),
            ConfigKey::LoggingDirectory
        );
    }

    #[test]
    fn test_unknown_key() {
        let err = "cache.size".parse::<ConfigKey>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(ref k) if k == "cache.size"));
    }

    #[test]
    fn test_names_are_unique_and_round_trip() {
        let names: HashSet<String> = ConfigKey::all().iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), ConfigKey::all().len());
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();
        ConfigKey::QualityHighEligible
            .set(&mut config, "12.5")
            .unwrap();
        assert_eq!(config.quality.high_eligible, 12.5);
        assert_eq!(ConfigKey::QualityHighEligible.get(&config), "12.5");

        ConfigKey::QueuesFullMovingConcurrency
            .set(&mut config, " 2 ")
            .unwrap();
        assert_eq!(config.queues.full_moving_concurrency, 2);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::QueuesFullConcurrency
            .set(&mut config, "-1")
            .is_err());
        assert!(ConfigKey::QualityThumbUpgrade
            .set(&mut config, "-5")
            .is_err());
        assert!(ConfigKey::MovementMovingSpeed
            .set(&mut config, "NaN")
            .is_err());
        assert!(ConfigKey::CacheVersion.set(&mut config, "").is_err());
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_tilde_expansion() {
        let mut config = ConfigFile::default();
        ConfigKey::CacheDirectory
            .set(&mut config, "~/gallery-cache")
            .unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.cache.directory, home.join("gallery-cache"));
        }
    }
}
