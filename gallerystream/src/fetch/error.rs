//! Fetch error taxonomy.

use thiserror::Error;

use crate::queue::QueueError;

/// Errors produced while loading an image variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request could not be completed (DNS, TLS, connection reset, ...).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The URL already failed earlier in this session and is not retried.
    #[error("{url} previously failed in this session")]
    PreviouslyFailed { url: String },

    /// The load queue did not complete the task.
    #[error("load of {url} did not complete: {source}")]
    Queue {
        url: String,
        #[source]
        source: QueueError,
    },
}

impl FetchError {
    /// Returns the URL the error refers to.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::PreviouslyFailed { url }
            | FetchError::Queue { url, .. } => url,
        }
    }

    /// Returns the HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for the expected "variant does not exist" case.
    ///
    /// Missing variants are routine (not every upload has a medium rendition)
    /// and are kept out of the default log output.
    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404) | Some(410))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_not_found_detection() {
        let missing = FetchError::Status {
            url: "m.webp".to_string(),
            status: 404,
        };
        assert!(missing.is_not_found());
        assert_eq!(missing.status(), Some(404));

        let server = FetchError::Status {
            url: "m.webp".to_string(),
            status: 503,
        };
        assert!(!server.is_not_found());

        let transport = FetchError::Transport {
            url: "m.webp".to_string(),
            message: "connection reset".to_string(),
        };
        assert!(!transport.is_not_found());
        assert_eq!(transport.status(), None);
    }

    #[test]
    fn test_display_includes_url() {
        let err = FetchError::Status {
            url: "https://cdn/t.webp".to_string(),
            status: 500,
        };
        assert_eq!(err.to_string(), "HTTP 500 from https://cdn/t.webp");

        let err = FetchError::Queue {
            url: "https://cdn/o.jpg".to_string(),
            source: QueueError::TimedOut(Duration::from_secs(30)),
        };
        assert!(err.to_string().contains("https://cdn/o.jpg"));
        assert_eq!(err.url(), "https://cdn/o.jpg");
    }
}
