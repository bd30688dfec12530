//! PDF Harvest Core Library
//!
//! Turns a list of candidate `(title, url)` pairs, typically produced by an
//! external research agent, into verified PDF files in a flat output
//! directory, plus a per-item outcome report.
//!
//! # Architecture
//!
//! - [`intake`] - request records and the [`RequestSource`] seam for producers
//! - [`download`] - fetcher, integrity check, filename resolution, storage, engine
//! - [`report`] - aggregation of per-request outcomes into a summary
//! - [`config`] - explicit pipeline configuration passed into the engine
//!
//! Control flow per request:
//! intake → fetch (retry/backoff) → integrity check → filename → commit → report.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod intake;
pub mod report;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, ExistingFilePolicy, FetchConfig, PipelineConfig};
pub use download::{
    DownloadEngine, DownloadError, DownloadResult, DownloadStats, DownloadStatus, EngineError,
    ErrorKind, Fetcher, FilenameRegistry, HttpClient, RetryPolicy, Sleeper, Transport,
    backoff_delay, verify_pdf,
};
pub use intake::{
    DownloadRequest, IntakeError, ParseResult, RequestSource, StaticSource, TextSource,
    parse_requests,
};
pub use report::{FailureEntry, Summary};
pub use user_agent::BROWSER_USER_AGENT;
