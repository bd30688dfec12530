//! The unit of work handed over by a producer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One candidate document: a human-readable title and the URL to fetch.
///
/// The URL is kept as the producer supplied it; validation happens in the
/// fetcher so malformed links still get a result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Title used to derive the local filename. May be empty.
    #[serde(default)]
    pub title: String,
    /// Location of the document.
    pub url: String,
}

impl DownloadRequest {
    /// Creates a request from a title and URL.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            f.write_str(&self.url)
        } else {
            write!(f, "{} <{}>", self.title, self.url)
        }
    }
}
