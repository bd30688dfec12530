//! Retry logic with exponential backoff for transient fetch failures.
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - network errors and timeouts, retried with backoff
//! - [`FailureType::Permanent`] - everything else (HTTP status, invalid URL, oversize body)
//!
//! The [`RetryPolicy`] then decides whether to retry based on failure type
//! and attempt count. The delay itself comes from the pure [`backoff_delay`]
//! function; waiting goes through a [`Sleeper`] so tests can observe delays
//! without sleeping.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use pdfharvest_core::download::{DownloadError, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(32), false);
//! let error = DownloadError::timeout("https://example.com/paper.pdf");
//!
//! assert_eq!(
//!     policy.should_retry(&error, 1),
//!     RetryDecision::Retry { delay: Duration::from_secs(1), attempt: 2 }
//! );
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, instrument};

use super::DownloadError;
use crate::config::FetchConfig;

/// Maximum jitter added to delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Exponent cap so the shift in [`backoff_delay`] never overflows.
const MAX_BACKOFF_EXPONENT: u32 = 20;

/// Classification of fetch failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, connection refused, connection reset.
    Transient,

    /// Failure that a fresh attempt would not fix.
    ///
    /// Examples: any non-2xx HTTP status, invalid URL, oversize body.
    Permanent,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Delay before the retry that follows failed attempt `attempt` (1-indexed).
///
/// `base * 2^(attempt-1)`: attempt 1 waits `base`, attempt 2 waits `2 * base`, ...
/// Attempt 0 is treated as attempt 1.
#[must_use]
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    base.saturating_mul(1_u32 << exponent)
}

/// Retry configuration with exponential backoff.
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + jitter
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Whether random jitter is added on top of the capped delay.
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl RetryPolicy {
    /// Creates a new retry policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration, jitter: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            jitter,
        }
    }

    /// Builds the policy described by a fetch configuration.
    #[must_use]
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.max_retries,
            config.backoff_base,
            config.max_backoff,
            config.jitter,
        )
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed with `error`.
    #[instrument(level = "trace", skip(self, error), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, error: &DownloadError, attempt: u32) -> RetryDecision {
        if classify_error(error) == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let capped = backoff_delay(attempt, self.base_delay).min(self.max_delay);
        if self.jitter {
            capped + random_jitter()
        } else {
            capped
        }
    }
}

/// Random jitter between 0 and `MAX_JITTER`, so parallel workers that fail
/// together do not retry in lockstep.
fn random_jitter() -> Duration {
    let max_ms = u64::try_from(MAX_JITTER.as_millis()).unwrap_or(500);
    let jitter_ms = rand::thread_rng().gen_range(0..=max_ms);
    Duration::from_millis(jitter_ms)
}

/// Classifies a fetch error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | Network | Transient |
/// | HttpStatus (any) | Permanent |
/// | InvalidUrl | Permanent |
/// | BodyTooLarge | Permanent |
/// | Corrupt / Io / DeadlineExceeded / Aborted | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::Timeout { .. } | DownloadError::Network { .. } => FailureType::Transient,
        DownloadError::HttpStatus { .. }
        | DownloadError::InvalidUrl { .. }
        | DownloadError::BodyTooLarge { .. }
        | DownloadError::Corrupt { .. }
        | DownloadError::Io { .. }
        | DownloadError::DeadlineExceeded { .. }
        | DownloadError::Aborted { .. } => FailureType::Permanent,
    }
}

/// Waits out backoff delays.
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    /// Suspends the caller for `delay`.
    async fn sleep(&self, delay: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn no_jitter(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_secs(1),
            Duration::from_secs(32),
            false,
        )
    }

    #[test]
    fn test_backoff_delay_doubles_each_attempt() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(1, base), Duration::from_millis(250));
        assert_eq!(backoff_delay(2, base), Duration::from_millis(500));
        assert_eq!(backoff_delay(3, base), Duration::from_millis(1000));
        assert_eq!(backoff_delay(4, base), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_delay_attempt_zero_equals_base() {
        assert_eq!(
            backoff_delay(0, Duration::from_secs(2)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_backoff_delay_zero_base_is_zero() {
        assert_eq!(backoff_delay(7, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_backoff_delay_huge_attempt_does_not_overflow() {
        let delay = backoff_delay(u32::MAX, Duration::from_secs(1));
        assert_eq!(delay, Duration::from_secs(1 << MAX_BACKOFF_EXPONENT));
    }

    #[test]
    fn test_should_retry_timeout_below_limit() {
        let policy = no_jitter(3);
        let error = DownloadError::timeout("https://example.com/a.pdf");
        assert_eq!(
            policy.should_retry(&error, 1),
            RetryDecision::Retry {
                delay: Duration::from_secs(1),
                attempt: 2
            }
        );
        assert_eq!(
            policy.should_retry(&error, 2),
            RetryDecision::Retry {
                delay: Duration::from_secs(2),
                attempt: 3
            }
        );
    }

    #[test]
    fn test_should_retry_stops_at_max_attempts() {
        let policy = no_jitter(3);
        let error = DownloadError::timeout("https://example.com/a.pdf");
        match policy.should_retry(&error, 3) {
            RetryDecision::DoNotRetry { reason } => assert!(reason.contains("exhausted")),
            other @ RetryDecision::Retry { .. } => panic!("expected DoNotRetry, got {other:?}"),
        }
    }

    #[test]
    fn test_should_retry_never_retries_http_status() {
        let policy = no_jitter(5);
        for status in [400, 403, 404, 429, 500, 503] {
            let error = DownloadError::http_status("https://example.com/a.pdf", status);
            assert!(
                matches!(
                    policy.should_retry(&error, 1),
                    RetryDecision::DoNotRetry { .. }
                ),
                "HTTP {status} must not be retried"
            );
        }
    }

    #[test]
    fn test_should_retry_caps_delay_at_max() {
        let policy = RetryPolicy::new(
            10,
            Duration::from_secs(10),
            Duration::from_secs(15),
            false,
        );
        let error = DownloadError::timeout("https://example.com/a.pdf");
        assert_eq!(
            policy.should_retry(&error, 4),
            RetryDecision::Retry {
                delay: Duration::from_secs(15),
                attempt: 5
            }
        );
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(32), true);
        let error = DownloadError::timeout("https://example.com/a.pdf");
        for _ in 0..20 {
            let RetryDecision::Retry { delay, .. } = policy.should_retry(&error, 1) else {
                panic!("expected retry");
            };
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(1) + MAX_JITTER);
        }
    }

    #[test]
    fn test_new_clamps_zero_attempts_to_one() {
        assert_eq!(no_jitter(0).max_attempts(), 1);
    }

    #[test]
    fn test_classify_error_table() {
        assert_eq!(
            classify_error(&DownloadError::timeout("u")),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&DownloadError::http_status("u", 503)),
            FailureType::Permanent
        );
        assert_eq!(
            classify_error(&DownloadError::invalid_url("u", "missing host")),
            FailureType::Permanent
        );
        assert_eq!(
            classify_error(&DownloadError::body_too_large("u", 1)),
            FailureType::Permanent
        );
    }

    #[tokio::test]
    async fn test_tokio_sleeper_waits_zero_duration() {
        TokioSleeper.sleep(Duration::ZERO).await;
    }
}
