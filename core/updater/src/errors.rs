//! Error types for the updater.
//!
//! Every fallible operation in this crate returns [`UpdateError`]. The
//! variants follow the failure taxonomy of an update cycle: an unreachable
//! feed is benign and only logged, everything else is surfaced to the host.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the updater.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Consolidated error type for update cycle operations.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The release feed or asset host could not be reached (DNS, refused
    /// connection, no route). Expected when the machine is offline.
    #[error("host unreachable: {url}")]
    Unreachable {
        /// The URL that could not be reached.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status code.
    #[error("HTTP error {status}: {url}")]
    Http {
        /// The status code returned by the server.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// Any other transport failure (TLS, body read, scheme rejected).
    #[error("request failed: {url}")]
    Transport {
        /// The requested URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The release feed answered with a document that does not describe a release.
    #[error("malformed release response: {message}")]
    MalformedResponse {
        /// Description of what was missing or invalid.
        message: String,
    },

    /// The downloaded archive could not be extracted.
    #[error("extraction failed: {message}")]
    Extraction {
        /// Description of the extraction failure.
        message: String,
        /// The underlying I/O error, if any.
        #[source]
        source: Option<std::io::Error>,
    },

    /// A local filesystem operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("invalid configuration at {path}: {message}")]
    Config {
        /// Path of the offending configuration file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The host registry rejected an update.
    #[error("registration failed: {message}")]
    Registration {
        /// Description of the registry failure.
        message: String,
    },

    /// The operation was cancelled before it completed.
    #[error("operation cancelled: {message}")]
    Cancelled {
        /// What was in progress when cancellation was observed.
        message: String,
    },

    /// A background task panicked or was aborted.
    #[error("background task failed: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}

impl UpdateError {
    /// Classifies a `reqwest` error for the given URL.
    ///
    /// Connection and DNS failures become [`UpdateError::Unreachable`]; all
    /// other transport problems become [`UpdateError::Transport`].
    #[must_use]
    pub fn from_request(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_connect() {
            Self::Unreachable { url, source }
        } else {
            Self::Transport { url, source }
        }
    }

    /// Creates a new `Http` error.
    #[must_use]
    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    /// Creates a new `MalformedResponse` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Creates a new `Extraction` error without an I/O source.
    #[must_use]
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Extraction` error wrapping an I/O error.
    #[must_use]
    pub fn extraction_io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Extraction {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new `Io` error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            path: path.into(),
            source,
        }
    }

    /// Creates a new `Registration` error.
    #[must_use]
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }

    /// Creates a new `Cancelled` error.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Creates a new `Task` error.
    #[must_use]
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }

    /// Returns `true` for failures that end a cycle silently.
    ///
    /// Only an unreachable host qualifies; it is logged and retried on the
    /// next startup.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}
