//! Error types for the download module.
//!
//! [`DownloadError`] carries full context for logs and reports; [`ErrorKind`]
//! is the coarse classification recorded in every failed
//! [`DownloadResult`](super::DownloadResult).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::integrity::Corruption;

/// Errors that can occur while fetching, verifying or storing one document.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL is malformed or does not use http/https.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request did not complete within the configured timeout.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Server answered with a status outside 200-299.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Response body exceeded the configured size cap.
    #[error("response from {url} exceeds the {limit} byte limit")]
    BodyTooLarge {
        /// The URL whose body was too large.
        url: String,
        /// Configured cap in bytes.
        limit: u64,
    },

    /// Body was received but is not a well-formed PDF.
    #[error("downloaded content from {url} is not a PDF: {reason}")]
    Corrupt {
        /// The URL that served the content.
        url: String,
        /// What the integrity check found.
        reason: Corruption,
    },

    /// File system error while committing to the output directory.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The overall run deadline elapsed before this request finished.
    #[error("run deadline elapsed before {url} finished")]
    DeadlineExceeded {
        /// The URL still in flight.
        url: String,
    },

    /// The worker processing this request stopped unexpectedly.
    #[error("processing of {url} aborted unexpectedly")]
    Aborted {
        /// The URL being processed.
        url: String,
    },
}

impl DownloadError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a body-size error.
    pub fn body_too_large(url: impl Into<String>, limit: u64) -> Self {
        Self::BodyTooLarge {
            url: url.into(),
            limit,
        }
    }

    /// Creates a corruption error from an integrity check finding.
    pub fn corrupt(url: impl Into<String>, reason: Corruption) -> Self {
        Self::Corrupt {
            url: url.into(),
            reason,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a run-deadline error.
    pub fn deadline_exceeded(url: impl Into<String>) -> Self {
        Self::DeadlineExceeded { url: url.into() }
    }

    /// Creates an aborted-worker error.
    pub fn aborted(url: impl Into<String>) -> Self {
        Self::Aborted { url: url.into() }
    }

    /// Returns the report classification for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::Network { .. }
            | Self::Timeout { .. }
            | Self::BodyTooLarge { .. }
            | Self::DeadlineExceeded { .. }
            | Self::Aborted { .. } => ErrorKind::DownloadFailed,
            Self::HttpStatus { .. } => ErrorKind::HttpError,
            Self::Corrupt { .. } => ErrorKind::FileCorruption,
            Self::Io { .. } => ErrorKind::FilesystemError,
        }
    }

    /// Returns the HTTP status code when the server answered with an error status.
    #[must_use]
    pub fn http_status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path, which the source errors do not carry.

/// Coarse failure classification recorded in results and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    /// URL failed validation; no network call was made.
    #[serde(rename = "InvalidURL")]
    InvalidUrl,
    /// Network or timeout failures exhausted every attempt.
    DownloadFailed,
    /// Server answered with a non-2xx status.
    #[serde(rename = "HTTPError")]
    HttpError,
    /// Body failed the PDF integrity check.
    FileCorruption,
    /// Writing to the output directory failed.
    FilesystemError,
}

impl ErrorKind {
    /// Returns the stable label used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "InvalidURL",
            Self::DownloadFailed => "DownloadFailed",
            Self::HttpError => "HTTPError",
            Self::FileCorruption => "FileCorruption",
            Self::FilesystemError => "FilesystemError",
        }
    }

    /// Short user-facing suggestion for resolving this kind of failure.
    #[must_use]
    pub fn hint(self) -> &'static str {
        match self {
            Self::InvalidUrl => "Check that the link is an absolute http(s) URL.",
            Self::DownloadFailed => {
                "Check network connectivity, then retry with a longer --timeout or more --max-retries."
            }
            Self::HttpError => "The server refused the request; the link may be stale or restricted.",
            Self::FileCorruption => {
                "The server returned something other than a PDF (often an HTML landing page)."
            }
            Self::FilesystemError => "Check free space and permissions of the output directory.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
