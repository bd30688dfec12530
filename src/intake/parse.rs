//! Parsing producer output into [`DownloadRequest`]s.
//!
//! Research agents and humans hand over links in a handful of shapes. All of
//! these are accepted, and may be mixed line by line:
//!
//! - a JSON array of `{"title": ..., "url": ...}` objects (whole input)
//! - `Title | https://...` and `Title<TAB>https://...`
//! - markdown links `[Title](https://...)`
//! - `Title - https://...`, or a bare URL (title derived from the URL)
//! - a numbered list with the title and URL on separate lines:
//!
//! ```text
//! 1. **Deep Learning for Medical Imaging**
//!    URL: https://example.org/papers/dl-imaging.pdf
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, trace};

use super::DownloadRequest;
use crate::download::title_from_url;

/// `1. rest` or `1) rest`.
#[allow(clippy::expect_used)]
static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+[.)]\s+(?P<rest>.+)$").expect("numbered item regex is valid")
});

/// `Title: ...`, `- **URL:** ...`, `Link: ...`.
#[allow(clippy::expect_used)]
static LABELED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[-*]\s+)?(?:\*\*)?(?P<label>title|url|link|pdf)(?:\*\*)?\s*:\s*(?:\*\*)?\s*(?P<value>.+)$",
    )
    .expect("labeled field regex is valid")
});

#[allow(clippy::expect_used)]
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?P<title>[^\]]*)\]\((?P<url>[^)\s]+)\)").expect("markdown link regex is valid")
});

/// Optional leading title, then a URL that ends the line.
#[allow(clippy::expect_used)]
static TRAILING_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[-*]\s+)?(?P<title>.*?)[\s:\-–]*<?(?P<url>https?://[^\s<>]+?)>?$")
        .expect("trailing URL regex is valid")
});

/// Requests found in a piece of text plus the lines that could not be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Requests in input order.
    pub requests: Vec<DownloadRequest>,
    /// Lines (or orphaned titles) that did not yield a request.
    pub skipped: Vec<String>,
}

impl ParseResult {
    /// Returns true if no requests were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Returns the number of requests found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    fn push(&mut self, title: Option<String>, url: &str) {
        let url = clean_url(url);
        let title = title
            .filter(|t| !t.is_empty())
            .or_else(|| title_from_url(url))
            .unwrap_or_default();
        trace!(title = %title, url = %url, "parsed request");
        self.requests.push(DownloadRequest::new(title, url));
    }
}

/// Parses `input` into requests, keeping input order.
///
/// Never fails: unusable lines end up in [`ParseResult::skipped`].
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn parse_requests(input: &str) -> ParseResult {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        debug!("Empty input provided");
        return ParseResult::default();
    }

    if let Some(requests) = parse_json(trimmed) {
        info!(requests = requests.len(), "Parsed JSON input");
        return ParseResult {
            requests,
            skipped: Vec::new(),
        };
    }

    let result = parse_lines(trimmed);
    info!(
        requests = result.requests.len(),
        skipped = result.skipped.len(),
        "Parsing complete"
    );
    result
}

fn parse_json(input: &str) -> Option<Vec<DownloadRequest>> {
    if input.starts_with('[') {
        match serde_json::from_str::<Vec<DownloadRequest>>(input) {
            Ok(requests) => return Some(requests),
            Err(e) => debug!(error = %e, "input is not a JSON request list, parsing lines"),
        }
    } else if input.starts_with('{') {
        match serde_json::from_str::<DownloadRequest>(input) {
            Ok(request) => return Some(vec![request]),
            Err(e) => debug!(error = %e, "input is not a JSON request, parsing lines"),
        }
    }
    None
}

fn parse_lines(input: &str) -> ParseResult {
    let mut result = ParseResult::default();
    // Title from a numbered item or `Title:` line, waiting for its URL line.
    let mut pending_title: Option<String> = None;

    for raw in input.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        if let Some(caps) = LABELED_FIELD.captures(line) {
            let value = caps["value"].trim();
            if caps["label"].eq_ignore_ascii_case("title") {
                replace_pending(&mut result, &mut pending_title, clean_title(value));
                continue;
            }
            if let Some((title, url)) = parse_pair(value) {
                let title = if title.is_empty() { pending_title.take() } else { Some(title) };
                result.push(title, &url);
                continue;
            }
        }

        let body = NUMBERED_ITEM
            .captures(line)
            .and_then(|caps| caps.name("rest"))
            .map_or(line, |rest| rest.as_str().trim());
        let numbered = body.len() != line.len();

        if let Some((title, url)) = parse_pair(body) {
            let title = if title.is_empty() {
                pending_title.take()
            } else {
                if let Some(orphan) = pending_title.take() {
                    result.skipped.push(orphan);
                }
                Some(title)
            };
            result.push(title, &url);
        } else if numbered {
            replace_pending(&mut result, &mut pending_title, clean_title(body));
        } else {
            debug!(line = %line, "no request found on line");
            result.skipped.push(line.to_string());
        }
    }

    if let Some(orphan) = pending_title {
        result.skipped.push(orphan);
    }
    result
}

fn replace_pending(result: &mut ParseResult, pending: &mut Option<String>, title: String) {
    if let Some(orphan) = pending.replace(title) {
        debug!(title = %orphan, "title without a URL");
        result.skipped.push(orphan);
    }
}

/// Splits one line into `(title, url)`; the title may be empty.
fn parse_pair(line: &str) -> Option<(String, String)> {
    if let Some(caps) = MARKDOWN_LINK.captures(line) {
        return Some((clean_title(&caps["title"]), caps["url"].to_string()));
    }

    if let Some((title, url)) = line.split_once('\t') {
        let url = url.trim();
        if !url.is_empty() && !url.contains(char::is_whitespace) {
            return Some((clean_title(title), url.to_string()));
        }
    }

    if let Some((title, url)) = line.rsplit_once('|') {
        let url = url.trim();
        if !url.is_empty() && !url.contains(char::is_whitespace) {
            return Some((clean_title(title), url.to_string()));
        }
    }

    TRAILING_URL
        .captures(line)
        .map(|caps| (clean_title(&caps["title"]), caps["url"].to_string()))
}

fn clean_title(value: &str) -> String {
    value
        .replace("**", "")
        .replace("__", " ")
        .trim()
        .trim_matches(['"', '\'', '\u{201c}', '\u{201d}'])
        .trim_end_matches([':', '-', '\u{2013}', '|'])
        .trim()
        .to_string()
}

fn clean_url(value: &str) -> &str {
    value
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches([',', ';', '.'])
}
