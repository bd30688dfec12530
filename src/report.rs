//! Aggregation of per-request outcomes into a run summary.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::download::{DownloadResult, DownloadStatus, ErrorKind};

/// One failed request as shown in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    /// Request title.
    pub title: String,
    /// Request URL.
    pub url: String,
    /// Failure classification.
    pub kind: ErrorKind,
    /// Failure detail.
    pub message: String,
    /// Network attempts made.
    pub attempts: u32,
}

/// Counts per status plus the list of failures, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of results.
    pub total: usize,
    /// Results with status `Success`.
    pub succeeded: usize,
    /// Results with status `Skipped`.
    pub skipped: usize,
    /// Results with status `Failed`.
    pub failed: usize,
    /// Every failed request.
    pub failures: Vec<FailureEntry>,
}

impl Summary {
    /// Aggregates `results`. Pure: no I/O, no logging.
    #[must_use]
    pub fn from_results(results: &[DownloadResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            match result.status {
                DownloadStatus::Success => summary.succeeded += 1,
                DownloadStatus::Skipped => summary.skipped += 1,
                DownloadStatus::Failed => {
                    summary.failed += 1;
                    summary.failures.push(FailureEntry {
                        title: result.request.title.clone(),
                        url: result.request.url.clone(),
                        kind: result.error_kind.unwrap_or(ErrorKind::DownloadFailed),
                        message: result.message.clone().unwrap_or_default(),
                        attempts: result.attempts,
                    });
                }
            }
        }

        summary
    }

    /// Number of failures per kind, ordered by kind.
    #[must_use]
    pub fn failures_by_kind(&self) -> BTreeMap<ErrorKind, usize> {
        let mut grouped = BTreeMap::new();
        for failure in &self.failures {
            *grouped.entry(failure.kind).or_insert(0) += 1;
        }
        grouped
    }

    /// Whether no request failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Whether every request failed (and there was at least one).
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.failed == self.total
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Summary: {} total, {} succeeded, {} skipped, {} failed",
            self.total, self.succeeded, self.skipped, self.failed
        )?;

        if self.failures.is_empty() {
            return Ok(());
        }

        writeln!(f, "Failure summary by kind:")?;
        for (kind, count) in self.failures_by_kind() {
            writeln!(f, "- {kind}: {count}")?;
            writeln!(f, "  Fix: {}", kind.hint())?;
        }

        writeln!(f, "Failed items:")?;
        for failure in &self.failures {
            let label = if failure.title.is_empty() {
                failure.url.as_str()
            } else {
                failure.title.as_str()
            };
            let plural = if failure.attempts == 1 { "" } else { "s" };
            writeln!(
                f,
                "- [{}] {label}: {} ({} attempt{plural})",
                failure.kind, failure.message, failure.attempts
            )?;
        }
        Ok(())
    }
}
