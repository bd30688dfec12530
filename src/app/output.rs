//! Report rendering on stdout.

use anyhow::Result;
use pdfharvest_core::{DownloadResult, DownloadStatus, Summary};
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a Summary,
    results: &'a [DownloadResult],
}

/// One line per result, in input order.
pub(crate) fn render_result_line(result: &DownloadResult) -> String {
    let label = if result.request.title.is_empty() {
        result.request.url.as_str()
    } else {
        result.request.title.as_str()
    };
    let path = result
        .local_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_default();

    match result.status {
        DownloadStatus::Success => format!("[Success] {label} -> {path}"),
        DownloadStatus::Skipped => format!(
            "[Skipped] {label} -> {path} ({})",
            result.message.as_deref().unwrap_or("already present")
        ),
        DownloadStatus::Failed => format!(
            "[Failed] {label}: {}",
            result
                .error_kind
                .map_or("unknown", pdfharvest_core::ErrorKind::as_str)
        ),
    }
}

pub(crate) fn render_json(results: &[DownloadResult], summary: &Summary) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport { summary, results })?)
}

pub(crate) fn print_report(results: &[DownloadResult], summary: &Summary, json: bool) -> Result<()> {
    if json {
        println!("{}", render_json(results, summary)?);
        return Ok(());
    }

    for result in results {
        println!("{}", render_result_line(result));
    }
    println!();
    print!("{summary}");
    Ok(())
}
