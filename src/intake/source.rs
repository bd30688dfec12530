//! Producers of download requests.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument, warn};

use super::error::IntakeError;
use super::parse::{ParseResult, parse_requests};
use super::request::DownloadRequest;

/// Anything that can hand the pipeline an ordered list of requests.
///
/// The research agent that discovers candidate PDFs sits behind this trait;
/// the pipeline only sees its output.
#[async_trait]
pub trait RequestSource: Send + Sync {
    /// Returns the requests in the order the producer emitted them.
    async fn requests(&self) -> Result<Vec<DownloadRequest>, IntakeError>;
}

/// An in-memory list of requests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    requests: Vec<DownloadRequest>,
}

impl StaticSource {
    /// Wraps an existing list.
    #[must_use]
    pub fn new(requests: Vec<DownloadRequest>) -> Self {
        Self { requests }
    }
}

impl FromIterator<DownloadRequest> for StaticSource {
    fn from_iter<I: IntoIterator<Item = DownloadRequest>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[async_trait]
impl RequestSource for StaticSource {
    async fn requests(&self) -> Result<Vec<DownloadRequest>, IntakeError> {
        Ok(self.requests.clone())
    }
}

/// Where a [`TextSource`] reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOrigin {
    /// A file on disk.
    Path(PathBuf),
    /// Standard input, read to the end.
    Stdin,
    /// Text already in memory.
    Inline(String),
}

impl fmt::Display for TextOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Stdin => f.write_str("stdin"),
            Self::Inline(_) => f.write_str("inline text"),
        }
    }
}

/// Text in any of the formats understood by [`parse_requests`].
#[derive(Debug, Clone)]
pub struct TextSource {
    origin: TextOrigin,
}

impl TextSource {
    /// Reads from a file.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: TextOrigin::Path(path.into()),
        }
    }

    /// Reads from standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self {
            origin: TextOrigin::Stdin,
        }
    }

    /// Parses text already in memory.
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            origin: TextOrigin::Inline(text.into()),
        }
    }

    /// Returns where this source reads from.
    #[must_use]
    pub fn origin(&self) -> &TextOrigin {
        &self.origin
    }

    /// Reads and parses the input, keeping the skipped lines.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Read`] if the file or stdin cannot be read.
    #[instrument(skip(self), fields(origin = %self.origin))]
    pub async fn parse(&self) -> Result<ParseResult, IntakeError> {
        let text = self.read_text().await?;
        let parsed = parse_requests(&text);
        for line in &parsed.skipped {
            warn!(line = %line, "ignoring input line without a usable link");
        }
        debug!(
            requests = parsed.requests.len(),
            skipped = parsed.skipped.len(),
            "input parsed"
        );
        Ok(parsed)
    }

    async fn read_text(&self) -> Result<String, IntakeError> {
        match &self.origin {
            TextOrigin::Path(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| IntakeError::read(path.display().to_string(), e)),
            TextOrigin::Stdin => {
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .map_err(|e| IntakeError::read("stdin", e))?;
                Ok(text)
            }
            TextOrigin::Inline(text) => Ok(text.clone()),
        }
    }
}

#[async_trait]
impl RequestSource for TextSource {
    async fn requests(&self) -> Result<Vec<DownloadRequest>, IntakeError> {
        Ok(self.parse().await?.requests)
    }
}
