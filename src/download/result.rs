//! Per-request outcome records.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::error::{DownloadError, ErrorKind};
use crate::intake::DownloadRequest;

/// Terminal status of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DownloadStatus {
    /// A verified PDF was committed.
    Success,
    /// Nothing fetched: the file already exists or the request repeats an earlier one.
    Skipped,
    /// The request could not be completed; see the error kind.
    Failed,
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "Success",
            Self::Skipped => "Skipped",
            Self::Failed => "Failed",
        })
    }
}

/// Recorded outcome of processing one [`DownloadRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    /// The request this result belongs to.
    pub request: DownloadRequest,
    /// Terminal status.
    pub status: DownloadStatus,
    /// Committed file (success) or the file that made the request redundant (skipped).
    pub local_path: Option<PathBuf>,
    /// Failure classification; set exactly when `status` is `Failed`.
    pub error_kind: Option<ErrorKind>,
    /// Failure detail or skip reason.
    pub message: Option<String>,
    /// Network attempts made for this request.
    pub attempts: u32,
    /// Size of the committed file.
    pub bytes: Option<u64>,
}

impl DownloadResult {
    /// A verified file was committed at `path`.
    #[must_use]
    pub fn success(request: DownloadRequest, path: PathBuf, attempts: u32, bytes: u64) -> Self {
        Self {
            request,
            status: DownloadStatus::Success,
            local_path: Some(path),
            error_kind: None,
            message: None,
            attempts,
            bytes: Some(bytes),
        }
    }

    /// Nothing was fetched because `path` already covers this request.
    #[must_use]
    pub fn skipped(request: DownloadRequest, path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            request,
            status: DownloadStatus::Skipped,
            local_path: Some(path),
            error_kind: None,
            message: Some(reason.into()),
            attempts: 0,
            bytes: None,
        }
    }

    /// The request failed with `error` after `attempts` network attempts.
    #[must_use]
    pub fn failed(request: DownloadRequest, error: &DownloadError, attempts: u32) -> Self {
        Self {
            request,
            status: DownloadStatus::Failed,
            local_path: None,
            error_kind: Some(error.kind()),
            message: Some(error.to_string()),
            attempts,
            bytes: None,
        }
    }

    /// Outcome for a repeat of an earlier request with the same URL.
    ///
    /// A repeat is skipped only when `first` left a file in place; otherwise
    /// it inherits the failure kind with zero attempts of its own.
    #[must_use]
    pub fn repeat_of(request: DownloadRequest, first: &DownloadResult) -> Self {
        match (&first.status, &first.local_path) {
            (DownloadStatus::Success | DownloadStatus::Skipped, Some(path)) => Self::skipped(
                request,
                path.clone(),
                "duplicate of an earlier request in this run",
            ),
            _ => Self {
                request,
                status: DownloadStatus::Failed,
                local_path: None,
                error_kind: Some(first.error_kind.unwrap_or(ErrorKind::DownloadFailed)),
                message: Some(format!(
                    "duplicate of an earlier request that failed: {}",
                    first.message.as_deref().unwrap_or("unknown error")
                )),
                attempts: 0,
                bytes: None,
            },
        }
    }

    /// Whether the request ended in `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == DownloadStatus::Success
    }

    /// Whether the request ended in `Failed`.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == DownloadStatus::Failed
    }
}
