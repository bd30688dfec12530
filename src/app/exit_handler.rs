//! Exit code logic for the pdfharvest process.
//!
//! Single responsibility: map the run summary to the process exit outcome.

use pdfharvest_core::Summary;

use crate::ProcessExit;

/// Determines the process exit outcome from completed and failed request counts.
///
/// Skipped requests count as completed: the file is already in place.
pub(crate) fn determine_exit_outcome(completed: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

pub(crate) fn exit_for_summary(summary: &Summary) -> ProcessExit {
    determine_exit_outcome(summary.succeeded + summary.skipped, summary.failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_outcome_success_when_no_failures() {
        assert_eq!(determine_exit_outcome(3, 0), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_success_when_zero_completed_zero_failed() {
        assert_eq!(determine_exit_outcome(0, 0), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_partial_when_mixed() {
        assert_eq!(determine_exit_outcome(2, 1), ProcessExit::Partial);
    }

    #[test]
    fn test_exit_outcome_failure_when_all_failed() {
        assert_eq!(determine_exit_outcome(0, 2), ProcessExit::Failure);
    }

    #[test]
    fn test_skipped_counts_as_completed() {
        let summary = Summary {
            total: 2,
            skipped: 1,
            failed: 1,
            ..Summary::default()
        };
        assert_eq!(exit_for_summary(&summary), ProcessExit::Partial);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Failure.code(), 1);
        assert_eq!(ProcessExit::Partial.code(), 2);
    }
}
