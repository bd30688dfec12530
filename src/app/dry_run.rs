//! Dry-run flow: show where each request would be written without fetching.

use std::path::{Path, PathBuf};

use anyhow::Result;
use pdfharvest_core::DownloadRequest;
use pdfharvest_core::download::{PlanStep, plan_requests};
use serde::Serialize;
use tracing::info;

/// What a real run would do with one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum PlannedAction {
    Fetch { path: PathBuf },
    Duplicate { path: PathBuf },
    Reject { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PlannedRequest {
    pub(crate) title: String,
    pub(crate) url: String,
    #[serde(flatten)]
    pub(crate) action: PlannedAction,
}

/// Resolves filenames through the same planning pass a real run uses.
pub(crate) fn plan(requests: &[DownloadRequest], output_dir: &Path) -> Vec<PlannedRequest> {
    requests
        .iter()
        .zip(plan_requests(requests))
        .map(|(request, step)| {
            let action = match step {
                PlanStep::Fetch { filename } => PlannedAction::Fetch {
                    path: output_dir.join(filename),
                },
                PlanStep::Repeat { filename, .. } => PlannedAction::Duplicate {
                    path: output_dir.join(filename),
                },
                PlanStep::Reject(error) => PlannedAction::Reject {
                    reason: error.to_string(),
                },
            };
            PlannedRequest {
                title: request.title.clone(),
                url: request.url.clone(),
                action,
            }
        })
        .collect()
}

fn render_line(planned: &PlannedRequest) -> String {
    match &planned.action {
        PlannedAction::Fetch { path } => format!("- [fetch] {} -> {}", planned.url, path.display()),
        PlannedAction::Duplicate { path } => {
            format!("- [duplicate] {} -> {}", planned.url, path.display())
        }
        PlannedAction::Reject { reason } => format!("- [invalid] {} -> {reason}", planned.url),
    }
}

pub(crate) fn run_dry_run_preview(
    requests: &[DownloadRequest],
    output_dir: &Path,
    json: bool,
) -> Result<()> {
    let planned = plan(requests, output_dir);
    info!(requests = planned.len(), "Dry run preview");

    if json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    println!("Dry run preview: {} request(s).", planned.len());
    for entry in &planned {
        println!("{}", render_line(entry));
    }
    println!("Dry run - no files downloaded");
    Ok(())
}
