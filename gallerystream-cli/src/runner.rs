//! Shared setup for commands that run a streaming session.

use tokio::runtime::Runtime;
use tracing::info;

use gallerystream::config::ConfigFile;
use gallerystream::logging::{init_logging, LoggingGuard, DEFAULT_LOG_FILE};

use crate::error::CliError;

/// Loaded configuration plus the logging guard for one CLI invocation.
pub struct CliRunner {
    config: ConfigFile,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Loads the config file and starts file logging.
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let logging = init_logging(&config.logging.directory, DEFAULT_LOG_FILE, verbose)
            .map_err(|e| CliError::Logging(e.to_string()))?;
        Ok(Self {
            config,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            version = gallerystream::VERSION,
            command,
            cache_dir = %self.config.cache.directory.display(),
            "gallerystream starting"
        );
    }
}

/// Multi-threaded runtime for session commands.
pub fn runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))
}
