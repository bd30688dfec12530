//! Pipeline engine driving requests through fetch, verify and commit.
//!
//! The engine first makes a sequential planning pass in input order
//! ([`plan_requests`]): URLs are validated and every remaining request claims
//! its filename. Claimed requests are then processed concurrently, bounded by
//! a semaphore. Repeats of a URL are settled after the first occurrence
//! finishes and take their outcome from it. Results always come back in
//! input order.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pdfharvest_core::{DownloadEngine, DownloadRequest, HttpClient, PipelineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DownloadEngine::new(
//!     PipelineConfig::new("./pdf_downloads"),
//!     Arc::new(HttpClient::new()?),
//! )?;
//! let results = engine
//!     .run(vec![DownloadRequest::new("AI in Healthcare", "https://example.com/a.pdf")])
//!     .await;
//! println!("{:?}", results[0].status);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::client::Transport;
use super::error::DownloadError;
use super::fetcher::{FetchFailure, Fetcher};
use super::integrity::verify_pdf;
use super::plan::{PlanStep, plan_requests};
use super::result::{DownloadResult, DownloadStatus};
use super::retry::{Sleeper, TokioSleeper};
use super::storage;
use crate::config::{ConfigError, ExistingFilePolicy, PipelineConfig};
use crate::intake::{DownloadRequest, IntakeError, RequestSource};

/// Error type for download engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The pipeline configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Live counters updated as requests reach a terminal status.
///
/// Uses atomic counters so spawned workers and progress reporters can share
/// one instance.
#[derive(Debug, Default)]
pub struct DownloadStats {
    succeeded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed downloads.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Returns the number of skipped requests.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Returns the number of failed requests.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of requests that reached a terminal status.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.succeeded() + self.skipped() + self.failed()
    }

    /// Returns the number of extra attempts made beyond the first.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    fn record(&self, result: &DownloadResult) {
        let counter = match result.status {
            DownloadStatus::Success => &self.succeeded,
            DownloadStatus::Skipped => &self.skipped,
            DownloadStatus::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        let extra = usize::try_from(result.attempts.saturating_sub(1)).unwrap_or(usize::MAX);
        self.retried.fetch_add(extra, Ordering::SeqCst);
    }
}

/// State shared by every worker task.
#[derive(Debug)]
struct Worker {
    fetcher: Fetcher,
    output_dir: PathBuf,
    on_existing: ExistingFilePolicy,
}

/// Concurrent download pipeline.
///
/// # Concurrency Model
///
/// - Each claimed request runs in its own Tokio task
/// - A semaphore permit is acquired before spawning, so at most
///   `concurrency` fetches are in flight
/// - Permits are released automatically when a task finishes (RAII)
/// - Filenames are claimed before any task starts, so uniqueness never
///   depends on completion order
#[derive(Debug)]
pub struct DownloadEngine {
    worker: Arc<Worker>,
    semaphore: Arc<Semaphore>,
    config: PipelineConfig,
    stats: Arc<DownloadStats>,
}

impl DownloadEngine {
    /// Creates an engine using `transport` for network access.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the configuration is out of range.
    pub fn new(config: PipelineConfig, transport: Arc<dyn Transport>) -> Result<Self, EngineError> {
        Self::with_sleeper(config, transport, Arc::new(TokioSleeper))
    }

    /// Creates an engine whose backoff waits go through `sleeper`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the configuration is out of range.
    #[instrument(level = "debug", skip(transport, sleeper))]
    pub fn with_sleeper(
        config: PipelineConfig,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        debug!(
            concurrency = config.concurrency,
            max_retries = config.fetch.max_retries,
            timeout_secs = config.fetch.timeout.as_secs(),
            on_existing = %config.on_existing,
            "creating download engine"
        );

        let fetcher = Fetcher::new(transport, &config.fetch).with_sleeper(sleeper);
        Ok(Self {
            worker: Arc::new(Worker {
                fetcher,
                output_dir: config.output_dir.clone(),
                on_existing: config.on_existing,
            }),
            semaphore: Arc::new(Semaphore::new(config.concurrency)),
            config,
            stats: Arc::new(DownloadStats::new()),
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    /// Shared counters, updated as requests finish across every run of this engine.
    #[must_use]
    pub fn stats(&self) -> Arc<DownloadStats> {
        Arc::clone(&self.stats)
    }

    /// Processes a single request.
    pub async fn process_one(&self, request: DownloadRequest) -> DownloadResult {
        let url = request.url.clone();
        let mut results = self.run(vec![request.clone()]).await;
        results
            .pop()
            .unwrap_or_else(|| DownloadResult::failed(request, &DownloadError::aborted(url), 0))
    }

    /// Pulls requests from `source` and processes them.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError`] if the source cannot produce its requests.
    pub async fn run_source(
        &self,
        source: &dyn RequestSource,
    ) -> Result<Vec<DownloadResult>, IntakeError> {
        let requests = source.requests().await?;
        Ok(self.run(requests).await)
    }

    /// Processes every request and returns one result per request, in input order.
    ///
    /// Individual failures never abort the run. The output directory is not
    /// created here; callers prepare it with [`storage::ensure_output_dir`].
    #[instrument(skip(self, requests), fields(requests = requests.len(), output_dir = %self.worker.output_dir.display()))]
    pub async fn run(&self, requests: Vec<DownloadRequest>) -> Vec<DownloadResult> {
        let deadline = self.config.run_timeout.map(|limit| Instant::now() + limit);
        let steps = plan_requests(&requests);
        let mut slots: Vec<Option<DownloadResult>> = vec![None; requests.len()];
        let mut repeats = Vec::new();
        let mut handles = Vec::new();

        info!("starting run");

        for ((index, request), step) in requests.into_iter().enumerate().zip(steps) {
            let filename = match step {
                PlanStep::Fetch { filename } => filename,
                PlanStep::Repeat { first, .. } => {
                    repeats.push((index, first, request));
                    continue;
                }
                PlanStep::Reject(error) => {
                    let result = DownloadResult::failed(request, &error, 0);
                    self.stats.record(&result);
                    slots[index] = Some(result);
                    continue;
                }
            };

            let Some(permit) = self.acquire(deadline).await else {
                warn!(url = %request.url, "run deadline elapsed before request started");
                let error = DownloadError::deadline_exceeded(&request.url);
                let result = DownloadResult::failed(request, &error, 0);
                self.stats.record(&result);
                slots[index] = Some(result);
                continue;
            };

            let worker = Arc::clone(&self.worker);
            let stats = Arc::clone(&self.stats);
            let task_request = request.clone();
            handles.push((
                index,
                request,
                tokio::spawn(async move {
                    let _permit = permit;
                    let result = worker.process(task_request, filename, deadline).await;
                    stats.record(&result);
                    result
                }),
            ));
        }

        debug!(
            task_count = handles.len(),
            "waiting for downloads to complete"
        );

        for (index, request, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(url = %request.url, error = %e, "download task panicked");
                    let error = DownloadError::aborted(&request.url);
                    let result = DownloadResult::failed(request, &error, 0);
                    self.stats.record(&result);
                    result
                }
            };
            slots[index] = Some(result);
        }

        // Repeats always point at an earlier, already resolved index.
        for (index, first, request) in repeats {
            let result = match slots.get(first).and_then(Option::as_ref) {
                Some(first_result) => DownloadResult::repeat_of(request, first_result),
                None => {
                    let error = DownloadError::aborted(&request.url);
                    DownloadResult::failed(request, &error, 0)
                }
            };
            self.stats.record(&result);
            slots[index] = Some(result);
        }

        let results: Vec<DownloadResult> = slots.into_iter().flatten().collect();
        info!(
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            failed = results.iter().filter(|r| r.is_failed()).count(),
            total = results.len(),
            "run complete"
        );
        results
    }

    async fn acquire(&self, deadline: Option<Instant>) -> Option<OwnedSemaphorePermit> {
        let permit = Arc::clone(&self.semaphore).acquire_owned();
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, permit)
                .await
                .ok()
                .and_then(Result::ok),
            None => permit.await.ok(),
        }
    }
}

impl Worker {
    async fn process(
        &self,
        request: DownloadRequest,
        filename: String,
        deadline: Option<Instant>,
    ) -> DownloadResult {
        let Some(deadline) = deadline else {
            return self.execute(request, filename).await;
        };

        let url = request.url.clone();
        match tokio::time::timeout_at(deadline, self.execute(request.clone(), filename)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %url, "run deadline elapsed while request was in flight");
                DownloadResult::failed(request, &DownloadError::deadline_exceeded(url), 0)
            }
        }
    }

    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn execute(&self, request: DownloadRequest, filename: String) -> DownloadResult {
        let target = self.output_dir.join(&filename);
        if self.on_existing == ExistingFilePolicy::Skip && storage::existing_pdf(&target).await {
            info!(path = %target.display(), "already downloaded, skipping");
            return DownloadResult::skipped(request, target, "file already exists");
        }

        let fetched = match self.fetcher.fetch(&request.url).await {
            Ok(fetched) => fetched,
            Err(FetchFailure { error, attempts }) => {
                warn!(error = %error, attempts, "download failed after all attempts");
                return DownloadResult::failed(request, &error, attempts);
            }
        };
        let attempts = fetched.attempts;
        let body = fetched.body;

        if let Some(content_type) = body.content_type.as_deref()
            && !content_type.to_ascii_lowercase().contains("pdf")
        {
            debug!(content_type, "server did not label the response as PDF");
        }

        if let Err(reason) = verify_pdf(&body.bytes) {
            let error = DownloadError::corrupt(&request.url, reason);
            warn!(error = %error, "integrity check failed");
            return DownloadResult::failed(request, &error, attempts);
        }

        match storage::commit(&self.output_dir, &filename, &body.bytes).await {
            Ok(path) => {
                let bytes = body.bytes.len() as u64;
                info!(path = %path.display(), bytes, attempts, "download completed");
                DownloadResult::success(request, path, attempts, bytes)
            }
            Err(error) => {
                warn!(error = %error, "could not commit file");
                DownloadResult::failed(request, &error, attempts)
            }
        }
    }
}
