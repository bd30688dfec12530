//! CLI argument definitions using clap derive macros.
//!
//! Every tunable is an `Option` so that unset flags fall through to the
//! environment, then the config file, then the built-in defaults.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use pdfharvest_core::ExistingFilePolicy;

/// Download and verify the PDFs a research agent found.
///
/// Reads `(title, url)` pairs from files or stdin (JSON, `title | url`
/// lines, markdown links, bare URLs or a numbered list with `URL:` lines),
/// fetches each one with retries, keeps only real PDFs and reports the outcome.
#[derive(Parser, Debug)]
#[command(name = "pdfharvest")]
#[command(author, version, about)]
pub struct Args {
    /// Input files with title/URL pairs; `-` reads stdin (default when piped)
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Directory the verified PDFs are written to
    #[arg(short = 'o', long, env = "PDF_OUTPUT_DIR", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Per-request timeout in seconds, covering connect and body (1-3600)
    #[arg(short = 't', long, env = "DOWNLOAD_TIMEOUT", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Total attempts per URL for timeouts and network errors (1-10)
    #[arg(short = 'r', long, env = "MAX_RETRIES", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_retries: Option<u32>,

    /// Delay before the first retry in milliseconds; doubles each attempt (0-60000)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub backoff_base_ms: Option<u64>,

    /// Maximum concurrent downloads (1-32)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub concurrency: Option<u8>,

    /// What to do when the target file already exists: skip or overwrite
    #[arg(long, value_name = "POLICY", value_parser = ExistingFilePolicy::from_str)]
    pub on_existing: Option<ExistingFilePolicy>,

    /// Overall deadline for the whole run in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub run_timeout: Option<u64>,

    /// Send a desktop browser User-Agent instead of identifying as pdfharvest
    #[arg(long)]
    pub browser_user_agent: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Parse input and show the resolved filenames without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
