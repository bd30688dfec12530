//! HTTP transport for fetching document bodies.
//!
//! The fetcher reaches the network only through the [`Transport`] trait so
//! retry behavior can be exercised against scripted fakes. [`HttpClient`] is
//! the production implementation on top of reqwest.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::DownloadError;
use crate::user_agent;

/// Bounds applied to a single GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    /// Hard bound from connect until the whole body is read.
    pub timeout: Duration,
    /// Largest accepted body in bytes.
    pub max_bytes: u64,
}

/// A successfully received response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    /// Raw body bytes.
    pub bytes: Vec<u8>,
    /// `Content-Type` header, when the server sent one.
    pub content_type: Option<String>,
}

/// Performs one GET per call. Implementations must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `url`, returning the body on a 2xx response.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Timeout`] when `limits.timeout` elapses
    /// - [`DownloadError::Network`] on connection-level failures
    /// - [`DownloadError::HttpStatus`] for any status outside 200-299
    /// - [`DownloadError::BodyTooLarge`] when the body exceeds `limits.max_bytes`
    async fn get(&self, url: &Url, limits: RequestLimits) -> Result<FetchedBody, DownloadError>;
}

/// reqwest-backed [`Transport`].
///
/// Create once and share; clones reuse the same connection pool.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use pdfharvest_core::download::{HttpClient, RequestLimits, Transport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let url = url::Url::parse("https://example.com/paper.pdf")?;
/// let limits = RequestLimits { timeout: Duration::from_secs(30), max_bytes: 1 << 20 };
/// let body = client.get(&url, limits).await?;
/// println!("{} bytes", body.bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client that identifies itself with the tool's User-Agent.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialize.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_user_agent(&user_agent::default_download_user_agent())
    }

    /// Creates a client sending a custom User-Agent header.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialize.
    #[instrument(level = "debug")]
    pub fn with_user_agent(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(level = "debug", skip(self, limits), fields(url = %url))]
    async fn get(&self, url: &Url, limits: RequestLimits) -> Result<FetchedBody, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(limits.timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > limits.max_bytes)
        {
            return Err(DownloadError::body_too_large(url.as_str(), limits.max_bytes));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let bytes = read_body(response, url, limits.max_bytes).await?;
        debug!(bytes = bytes.len(), content_type = ?content_type, "body received");

        Ok(FetchedBody {
            bytes,
            content_type,
        })
    }
}

/// Streams the body into memory, enforcing the size cap as chunks arrive.
async fn read_body(
    response: reqwest::Response,
    url: &Url,
    max_bytes: u64,
) -> Result<Vec<u8>, DownloadError> {
    let capacity = response
        .content_length()
        .and_then(|len| usize::try_from(len).ok())
        .unwrap_or(0);
    let mut body = Vec::with_capacity(capacity);
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| map_reqwest_error(url, e))?;
        if (body.len() + chunk.len()) as u64 > max_bytes {
            return Err(DownloadError::body_too_large(url.as_str(), max_bytes));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

fn map_reqwest_error(url: &Url, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url.as_str())
    } else {
        DownloadError::network(url.as_str(), error)
    }
}
