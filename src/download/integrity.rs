//! PDF integrity check applied to every body before it reaches disk.

use std::fmt;

/// Byte sequence every PDF file starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Why a body failed the integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    /// Zero-length body.
    Empty,
    /// Body is an HTML document, typically a landing or error page.
    HtmlDocument,
    /// Body does not start with `%PDF-`.
    MissingMagicHeader,
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty body",
            Self::HtmlDocument => "received an HTML page instead of a PDF",
            Self::MissingMagicHeader => "missing %PDF- header",
        })
    }
}

/// Verifies that `bytes` is non-empty and starts with the PDF magic header.
///
/// # Errors
///
/// Returns the [`Corruption`] found. HTML bodies are reported separately from
/// other non-PDF content so failure messages point at the usual cause.
pub fn verify_pdf(bytes: &[u8]) -> Result<(), Corruption> {
    if bytes.is_empty() {
        return Err(Corruption::Empty);
    }
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    if looks_like_html(bytes) {
        Err(Corruption::HtmlDocument)
    } else {
        Err(Corruption::MissingMagicHeader)
    }
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with("<!doctype html") || trimmed.starts_with("<html") || trimmed.contains("<head")
}
