//! Fetching, verifying and storing candidate PDFs.
//!
//! This module turns each [`DownloadRequest`](crate::intake::DownloadRequest)
//! into a [`DownloadResult`]:
//!
//! - [`Fetcher`] issues bounded-time GETs through a [`Transport`], retrying
//!   timeouts and network errors with exponential backoff
//! - [`verify_pdf`] rejects bodies that do not start with `%PDF-`
//! - [`FilenameRegistry`] resolves `<title>_<url hash>.pdf` names, unique per run
//! - [`plan_requests`] validates URLs and claims names before any fetch
//! - [`storage`] commits verified bytes atomically into the output directory
//! - [`DownloadEngine`] drives all of the above concurrently
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pdfharvest_core::download::{Fetcher, HttpClient, verify_pdf};
//! use pdfharvest_core::FetchConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new(Arc::new(HttpClient::new()?), &FetchConfig::default());
//! match fetcher.fetch("https://example.com/paper.pdf").await {
//!     Ok(fetched) => println!("looks like a PDF: {}", verify_pdf(&fetched.body.bytes).is_ok()),
//!     Err(failure) => println!("{} after {} attempts", failure.error, failure.attempts),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod fetcher;
mod filename;
mod integrity;
mod plan;
mod result;
mod retry;
pub mod storage;

pub use client::{FetchedBody, HttpClient, RequestLimits, Transport};
pub use engine::{DownloadEngine, DownloadStats, EngineError};
pub use error::{DownloadError, ErrorKind};
pub use fetcher::{FetchFailure, FetchSuccess, Fetcher, validate_url};
pub use filename::{
    Claim, FilenameRegistry, filename_for, filename_stem, sanitize_title, title_from_url, url_hash,
};
pub use integrity::{Corruption, PDF_MAGIC, verify_pdf};
pub use plan::{PlanStep, plan_requests};
pub use result::{DownloadResult, DownloadStatus};
pub use retry::{
    FailureType, RetryDecision, RetryPolicy, Sleeper, TokioSleeper, backoff_delay, classify_error,
};

// Note: no module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
