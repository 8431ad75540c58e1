//! CLI error type.

use std::fmt;

use gallerystream::config::ConfigError;
use gallerystream::session::SessionError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or unusable configuration
    Config(String),
    /// Config file could not be read or written
    ConfigFile(ConfigError),
    /// Cache directory could not be opened
    CacheOpen(String),
    /// Clearing the cache failed
    CacheClear(String),
    /// Reading cache statistics failed
    CacheStats(String),
    /// Logging could not be initialized
    Logging(String),
    /// Async runtime could not be created
    Runtime(String),
    /// Streaming session failed to start
    Session(SessionError),
    /// Every URL in a warm run failed
    Warm(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::CacheOpen(msg) => write!(f, "Failed to open cache: {}", msg),
            CliError::CacheClear(msg) => write!(f, "Failed to clear cache: {}", msg),
            CliError::CacheStats(msg) => write!(f, "Failed to read cache stats: {}", msg),
            CliError::Logging(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to start async runtime: {}", msg),
            CliError::Session(e) => write!(f, "Failed to start streaming session: {}", e),
            CliError::Warm(msg) => write!(f, "Cache warm failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Session(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}
