//! Fetcher: URL validation plus bounded, backed-off retries around a [`Transport`].
//!
//! Per-request state: Pending → Retrying → Success | Failed.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use url::Url;

use super::client::{FetchedBody, RequestLimits, Transport};
use super::error::DownloadError;
use super::retry::{RetryDecision, RetryPolicy, Sleeper, TokioSleeper};
use crate::config::FetchConfig;

/// Body retrieved for a request, with the number of attempts it took.
#[derive(Debug)]
pub struct FetchSuccess {
    /// The 2xx response body.
    pub body: FetchedBody,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Terminal fetch failure, with the number of attempts made.
#[derive(Debug)]
pub struct FetchFailure {
    /// The error from the last attempt (or from validation).
    pub error: DownloadError,
    /// Attempts made; 0 when the URL was rejected before any network call.
    pub attempts: u32,
}

/// Parses `raw` and accepts only absolute http/https URLs with a host.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidUrl`] describing the problem.
pub fn validate_url(raw: &str) -> Result<Url, DownloadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DownloadError::invalid_url(raw, "empty URL"));
    }
    let url = Url::parse(trimmed).map_err(|_| DownloadError::invalid_url(raw, "malformed URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DownloadError::invalid_url(raw, "scheme must be http or https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(DownloadError::invalid_url(raw, "missing host"));
    }
    Ok(url)
}

/// Retrieves request bodies with timeout, retry and exponential backoff.
///
/// Holds no per-request state, so one fetcher is shared by every worker.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    limits: RequestLimits,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("sleeper", &self.sleeper)
            .field("policy", &self.policy)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Creates a fetcher that waits on the tokio timer between attempts.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &FetchConfig) -> Self {
        Self {
            transport,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::from_config(config),
            limits: RequestLimits {
                timeout: config.timeout,
                max_bytes: config.max_bytes,
            },
        }
    }

    /// Replaces the sleeper used for backoff delays.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Fetches `raw_url`, retrying transient failures.
    ///
    /// Invalid URLs fail with zero attempts. Non-2xx statuses fail after the
    /// attempt that saw them. Timeouts and network errors are retried until
    /// the policy's attempt limit, sleeping `backoff_delay(n, base)` after
    /// failed attempt `n`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchFailure`] holding the last error and the attempt count.
    #[instrument(skip(self), fields(max_attempts = self.policy.max_attempts()))]
    pub async fn fetch(&self, raw_url: &str) -> Result<FetchSuccess, FetchFailure> {
        let url = validate_url(raw_url).map_err(|error| FetchFailure { error, attempts: 0 })?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!(attempt, "attempting fetch");

            let error = match self.transport.get(&url, self.limits).await {
                Ok(body) => {
                    if attempt > 1 {
                        debug!(attempt, "fetch succeeded after retry");
                    }
                    return Ok(FetchSuccess {
                        body,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            match self.policy.should_retry(&error, attempt) {
                RetryDecision::Retry { delay, .. } => {
                    debug!(
                        attempt,
                        error = %error,
                        delay_ms = delay.as_millis(),
                        "transient failure, backing off"
                    );
                    self.sleeper.sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(attempt, error = %error, reason = %reason, "giving up");
                    return Err(FetchFailure {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}
