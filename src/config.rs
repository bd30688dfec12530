//! Explicit configuration for the download pipeline.
//!
//! The library never reads ambient process state: the binary resolves CLI
//! flags, environment variables and the config file into a [`PipelineConfig`]
//! and hands it to [`DownloadEngine::new`](crate::DownloadEngine::new).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum attempts per request (including the first).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff in milliseconds.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;

/// Upper bound for a single backoff delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(32);

/// Default number of requests processed at once (sequential).
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Default cap on a response body (200 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 200 * 1024 * 1024;

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "pdf_downloads";

pub(crate) const TIMEOUT_SECS_RANGE: (u64, u64) = (1, 3600);
pub(crate) const MAX_RETRIES_RANGE: (u32, u32) = (1, 10);
pub(crate) const BACKOFF_BASE_MS_MAX: u64 = 60_000;
pub(crate) const CONCURRENCY_RANGE: (usize, usize) = (1, 32);

/// Invalid configuration detected before any request is processed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric setting fell outside its accepted range.
    #[error("invalid value for `{field}`: {value}. Expected range: {min}..={max}")]
    OutOfRange {
        /// Setting name as used in the config file.
        field: &'static str,
        /// Rejected value.
        value: u64,
        /// Inclusive lower bound.
        min: u64,
        /// Inclusive upper bound.
        max: u64,
    },

    /// Unrecognized existing-file policy label.
    #[error("unknown existing-file policy '{0}': expected 'skip' or 'overwrite'")]
    UnknownPolicy(String),
}

/// What to do when the resolved filename already exists in the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingFilePolicy {
    /// Keep the existing file if it is a valid PDF and report the request as skipped.
    #[default]
    Skip,
    /// Fetch again and atomically replace the existing file.
    Overwrite,
}

impl ExistingFilePolicy {
    /// Returns the stable label used in config files and CLI flags.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for ExistingFilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExistingFilePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Per-request fetch settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Hard bound on one attempt, from connect until the body is read.
    pub timeout: Duration,
    /// Maximum attempts per request, including the first.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_base: Duration,
    /// Cap applied to any single backoff delay.
    pub max_backoff: Duration,
    /// Add up to 500ms of random jitter to each backoff delay.
    pub jitter: bool,
    /// Largest accepted response body in bytes.
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            max_backoff: DEFAULT_MAX_BACKOFF,
            jitter: true,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl FetchConfig {
    /// Checks every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "timeout_secs",
            self.timeout.as_secs(),
            TIMEOUT_SECS_RANGE.0,
            TIMEOUT_SECS_RANGE.1,
        )?;
        check_range(
            "max_retries",
            u64::from(self.max_retries),
            u64::from(MAX_RETRIES_RANGE.0),
            u64::from(MAX_RETRIES_RANGE.1),
        )?;
        check_range(
            "backoff_base_ms",
            u64::try_from(self.backoff_base.as_millis()).unwrap_or(u64::MAX),
            0,
            BACKOFF_BASE_MS_MAX,
        )?;
        Ok(())
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Flat directory receiving committed PDFs.
    pub output_dir: PathBuf,
    /// Requests processed at once; 1 means strictly sequential.
    pub concurrency: usize,
    /// Behavior when the resolved file already exists.
    pub on_existing: ExistingFilePolicy,
    /// Optional bound on the whole run.
    pub run_timeout: Option<Duration>,
    /// Per-request fetch settings.
    pub fetch: FetchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            concurrency: DEFAULT_CONCURRENCY,
            on_existing: ExistingFilePolicy::default(),
            run_timeout: None,
            fetch: FetchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults and the given output directory.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Checks every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "concurrency",
            self.concurrency as u64,
            CONCURRENCY_RANGE.0 as u64,
            CONCURRENCY_RANGE.1 as u64,
        )?;
        self.fetch.validate()
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
