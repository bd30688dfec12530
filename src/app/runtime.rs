use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use pdfharvest_core::download::storage;
use pdfharvest_core::{
    BROWSER_USER_AGENT, DownloadEngine, DownloadRequest, HttpClient, Summary, TextSource,
};
use tracing::{debug, info};

use crate::ProcessExit;
use crate::app::{config_manager, dry_run, exit_handler, output, progress_manager, terminal};
use crate::cli::Args;

/// Marker for reading standard input in the positional INPUT list.
const STDIN_MARKER: &str = "-";

pub(crate) async fn run_pdfharvest() -> Result<ProcessExit> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return Ok(exit_for_parse_error(&err));
        }
    };

    let default_level = terminal::resolve_default_log_level(args.verbose, args.quiet);
    terminal::init_tracing(
        default_level,
        terminal::no_color_env_requested() || terminal::is_dumb_terminal(),
    );

    debug!(?args, "CLI arguments parsed");

    let resolved = config_manager::resolve_config(&args)?;
    if let Some(path) = &resolved.config_path {
        info!(path = %path.display(), "Using config file");
    }
    let output_dir = resolved.pipeline.output_dir.clone();

    let sources = input_sources(&args.inputs, io::stdin().is_terminal());
    if sources.is_empty() {
        info!("No input provided. Pass a file of title/URL pairs or pipe one via stdin.");
        info!("Example: echo 'AI in Healthcare | https://example.com/a.pdf' | pdfharvest");
        return Ok(ProcessExit::Success);
    }

    let requests = collect_requests(&sources).await?;
    if requests.is_empty() {
        info!("No download requests found in input");
        return Ok(ProcessExit::Success);
    }

    if args.dry_run {
        dry_run::run_dry_run_preview(&requests, &output_dir, args.json)?;
        return Ok(ProcessExit::Success);
    }

    storage::ensure_output_dir(&output_dir)
        .await
        .with_context(|| format!("Output directory '{}' is not usable", output_dir.display()))?;

    let client = if resolved.browser_user_agent {
        HttpClient::with_user_agent(BROWSER_USER_AGENT)
    } else {
        HttpClient::new()
    }
    .context("Failed to build HTTP client")?;

    let engine = DownloadEngine::new(resolved.pipeline, Arc::new(client))?;
    info!(
        requests = requests.len(),
        concurrency = engine.concurrency(),
        output_dir = %output_dir.display(),
        "pdfharvest starting"
    );

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        args.json,
        terminal::is_dumb_terminal(),
    );
    let (progress_handle, stop) =
        progress_manager::spawn_progress_ui(use_spinner, engine.stats(), requests.len());

    let results = engine.run(requests).await;

    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    let summary = Summary::from_results(&results);
    info!(
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        retried = engine.stats().retried(),
        "Download complete"
    );
    output::print_report(&results, &summary, args.json)?;

    Ok(exit_handler::exit_for_summary(&summary))
}

/// Help and version output exit cleanly; any rejected flag or env value is fatal.
fn exit_for_parse_error(err: &clap::Error) -> ProcessExit {
    if err.use_stderr() {
        ProcessExit::Failure
    } else {
        ProcessExit::Success
    }
}

/// Positional inputs, or stdin when nothing was given and stdin is piped.
fn input_sources(inputs: &[PathBuf], stdin_is_terminal: bool) -> Vec<TextSource> {
    if inputs.is_empty() {
        return if stdin_is_terminal {
            Vec::new()
        } else {
            vec![TextSource::stdin()]
        };
    }

    inputs
        .iter()
        .map(|input| {
            if input.as_os_str() == STDIN_MARKER {
                TextSource::stdin()
            } else {
                TextSource::from_path(input)
            }
        })
        .collect()
}

async fn collect_requests(sources: &[TextSource]) -> Result<Vec<DownloadRequest>> {
    let mut requests = Vec::new();
    let mut skipped = 0;
    for source in sources {
        let parsed = source.parse().await?;
        skipped += parsed.skipped.len();
        requests.extend(parsed.requests);
    }
    info!(requests = requests.len(), skipped, "Parsed input");
    Ok(requests)
}
