//! Configuration file handling.
//!
//! Settings live in an INI file at `~/.gallerystream/config.ini`:
//!
//! ```ini
//! [cache]
//! directory = /home/user/.gallerystream/cache
//! ttl_days = 30
//!
//! [queues]
//! full_concurrency = 4
//! full_moving_concurrency = 1
//!
//! [quality]
//! thumb_upgrade = 50
//! medium_downgrade = 65
//! ```
//!
//! Missing keys take their defaults. Individual settings can be read and
//! written by name through [`ConfigKey`] (`gallerystream config set
//! quality.thumb_upgrade 40`).

mod file;
mod keys;

use std::path::PathBuf;

use thiserror::Error;

pub use file::{
    CacheSettings, ConfigFile, FetchSettings, LoggingSettings, MovementSettings, QualitySettings,
    QueueSettings,
};
pub use keys::ConfigKey;

/// Name of the per-user directory under the home directory.
const APP_DIR: &str = ".gallerystream";

/// Errors from loading, saving or interpreting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("{0}")]
    Invalid(String),
}

/// Per-user application directory (`~/.gallerystream`).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.ini")
}

/// Formats a byte count for humans ("500 bytes", "1.50 KB", "2.00 GB").
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = bytes as f64;
    if size >= GB {
        format!("{:.2} GB", size / GB)
    } else if size >= MB {
        format!("{:.2} MB", size / MB)
    } else if size >= KB {
        format!("{:.2} KB", size / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 bytes");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_config_file_path() {
        let path = config_file_path();
        assert!(path.ends_with(".gallerystream/config.ini"));
    }

    #[test]
    fn test_error_messages() {
        let err = ConfigError::InvalidValue {
            key: "quality.thumb_upgrade".to_string(),
            value: "far".to_string(),
            reason: "invalid float literal".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value 'far' for quality.thumb_upgrade: invalid float literal"
        );
        assert_eq!(
            ConfigError::UnknownKey("cache.size".to_string()).to_string(),
            "Unknown configuration key 'cache.size'"
        );
    }
}
