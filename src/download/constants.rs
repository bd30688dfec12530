//! Constants for the download module.

/// HTTP connect timeout (30 seconds); the per-request timeout still bounds the whole attempt.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Maximum characters kept from a sanitized title.
pub const MAX_TITLE_CHARS: usize = 80;

/// Hex characters of the URL hash appended to every filename.
pub const URL_HASH_CHARS: usize = 8;

/// Extension given to every committed document.
pub const PDF_EXTENSION: &str = ".pdf";

/// Suffix of in-progress temporary files in the output directory.
pub const PARTIAL_SUFFIX: &str = ".part";
