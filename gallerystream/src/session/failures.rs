//! Session-scoped record of URLs that failed.
//!
//! Once a URL fails it is never fetched again for the lifetime of the
//! session, which keeps a broken variant from producing a retry storm as
//! the camera moves back and forth. The set is never pruned; starting a new
//! session clears it.
//!
//! Logging is rate-limited per URL: expected "not found" failures log at
//! debug, everything else at warn at most once per cooldown window.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tracing::{debug, warn};

use crate::fetch::FetchError;
use crate::queue::QueueError;
use crate::resource::DimensionError;

/// Default per-URL cooldown between warn-level log lines.
pub const DEFAULT_ERROR_LOG_COOLDOWN: Duration = Duration::from_secs(5);

/// Failed URLs and their log rate limit.
#[derive(Debug)]
pub struct FailureRegistry {
    failed: DashSet<String>,
    last_logged: DashMap<String, Instant>,
    cooldown: Duration,
}

impl Default for FailureRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_LOG_COOLDOWN)
    }
}

impl FailureRegistry {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            failed: DashSet::new(),
            last_logged: DashMap::new(),
            cooldown,
        }
    }

    /// True if `url` failed earlier in this session.
    pub fn is_failed(&self, url: &str) -> bool {
        self.failed.contains(url)
    }

    /// Number of distinct failed URLs.
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Records a fetch failure and logs it.
    ///
    /// Fail-fast rejections and shutdown rejections are not failures of the
    /// URL itself and are ignored.
    pub fn record(&self, error: &FetchError) {
        match error {
            FetchError::PreviouslyFailed { .. } => return,
            FetchError::Queue {
                source: QueueError::Closed,
                ..
            } => return,
            _ => {}
        }

        let url = error.url();
        self.failed.insert(url.to_string());

        if error.is_not_found() {
            debug!(url = %url, "Variant not found");
        } else if self.should_log(url, Instant::now()) {
            warn!(url = %url, error = %error, "Image fetch failed");
        }
    }

    /// Records a fetched image that cannot be displayed.
    pub fn mark_invalid(&self, url: &str, error: &DimensionError) {
        self.failed.insert(url.to_string());
        if self.should_log(url, Instant::now()) {
            warn!(url = %url, error = %error, "Image has unusable dimensions");
        }
    }

    /// Returns true (and restarts the window) if `url` may be logged at `now`.
    pub fn should_log(&self, url: &str, now: Instant) -> bool {
        match self.last_logged.entry(url.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) < self.cooldown {
                    return false;
                }
                entry.insert(now);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }
}
