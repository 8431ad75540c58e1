//! Tracing subscriber setup.
//!
//! Logs go to a file in the configured log directory through a
//! non-blocking appender, and optionally to stderr. The level defaults to
//! `info` and can be overridden with `RUST_LOG`
//! (e.g. `RUST_LOG=gallerystream::queue=debug`).

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::macros::format_description;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log file name used by the CLI.
pub const DEFAULT_LOG_FILE: &str = "gallerystream.log";

/// Errors installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the background log writer alive. Buffered lines are flushed when
/// this is dropped, so hold it until the program exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _worker: WorkerGuard,
    log_file: PathBuf,
}

impl LoggingGuard {
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Installs the global tracing subscriber.
pub fn init_logging(
    log_dir: &Path,
    file_name: &str,
    console: bool,
) -> Result<LoggingGuard, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDir {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(log_dir, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local offset lookup can fail once threads exist; fall back to UTC.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        offset,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"),
    );

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(timer.clone());

    let console_layer = console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(timer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard {
        _worker: worker,
        log_file: log_dir.join(file_name),
    })
}
