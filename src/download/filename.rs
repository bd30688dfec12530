//! Filename derivation and run-scoped uniqueness for committed documents.
//!
//! Names follow `<sanitized title>_<url hash>.pdf`. The hash suffix makes the
//! name a pure function of `(title, url)`: re-running the same input resolves
//! to the same path, and identical titles with different URLs never collide.

use std::collections::HashMap;
use std::fmt::Write as _;

use sha2::{Digest, Sha256};
use url::Url;

use super::constants::{MAX_TITLE_CHARS, PDF_EXTENSION, URL_HASH_CHARS};
use crate::intake::DownloadRequest;

/// Stem used when neither the title nor the URL yields usable characters.
const FALLBACK_STEM: &str = "document";

/// Hash widths tried in order when a shorter prefix is already taken by another URL.
const HASH_WIDTHS: [usize; 3] = [URL_HASH_CHARS, 16, 64];

/// Replaces everything outside ASCII alphanumerics and `-_.` with `_`,
/// collapses separator runs, trims leading/trailing `_`/`.`, and truncates to
/// [`MAX_TITLE_CHARS`] characters.
///
/// The output is pure ASCII, so the character limit is also a byte limit and
/// the final name stays well under the filesystem's name length cap.
#[must_use]
pub fn sanitize_title(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches(|c| c == '_' || c == '.');
    let truncated: String = trimmed.chars().take(MAX_TITLE_CHARS).collect();
    truncated.trim_end_matches(['_', '.']).to_string()
}

/// Lowercase hex SHA-256 of the URL string.
#[must_use]
pub fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.trim().as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Human-readable title guessed from a URL: the last path segment without a
/// `.pdf` extension, else the host.
#[must_use]
pub fn title_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let from_segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
        .map(|last| {
            let decoded = urlencoding::decode(last)
                .map_or_else(|_| last.to_string(), std::borrow::Cow::into_owned);
            strip_pdf_extension(&decoded).trim().to_string()
        })
        .filter(|stem| !stem.is_empty());

    from_segment.or_else(|| parsed.host_str().map(ToString::to_string))
}

fn strip_pdf_extension(name: &str) -> &str {
    let len = name.len();
    if len > PDF_EXTENSION.len()
        && name.is_char_boundary(len - PDF_EXTENSION.len())
        && name[len - PDF_EXTENSION.len()..].eq_ignore_ascii_case(PDF_EXTENSION)
    {
        &name[..len - PDF_EXTENSION.len()]
    } else {
        name
    }
}

/// Sanitized stem for a request: title first, then the URL, then a fixed fallback.
#[must_use]
pub fn filename_stem(request: &DownloadRequest) -> String {
    let from_title = sanitize_title(&request.title);
    if !from_title.is_empty() {
        return from_title;
    }
    let from_url = title_from_url(&request.url)
        .map(|title| sanitize_title(&title))
        .unwrap_or_default();
    if from_url.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        from_url
    }
}

/// Default filename for a request, ignoring any other claims in the run.
#[must_use]
pub fn filename_for(request: &DownloadRequest) -> String {
    compose(&filename_stem(request), &url_hash(&request.url), URL_HASH_CHARS)
}

fn compose(stem: &str, hash: &str, width: usize) -> String {
    let width = width.min(hash.len());
    format!("{stem}_{}{PDF_EXTENSION}", &hash[..width])
}

/// Outcome of claiming a filename within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The name is now reserved for this request's URL.
    Assigned(String),
    /// The same URL already claimed this name earlier in the run.
    Duplicate(String),
}

impl Claim {
    /// The claimed or previously claimed filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        match self {
            Self::Assigned(name) | Self::Duplicate(name) => name,
        }
    }
}

/// Filenames handed out during one run, keyed by name with the owning URL.
#[derive(Debug, Default)]
pub struct FilenameRegistry {
    claims: HashMap<String, String>,
}

impl FilenameRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a filename for `request`.
    ///
    /// The default name is used unless a different URL already holds it, in
    /// which case the hash suffix is widened. A request whose URL already holds
    /// the name is reported as [`Claim::Duplicate`].
    pub fn claim(&mut self, request: &DownloadRequest) -> Claim {
        let url = request.url.trim();
        let stem = filename_stem(request);
        let hash = url_hash(url);

        for width in HASH_WIDTHS {
            let name = compose(&stem, &hash, width);
            match self.claims.get(&name) {
                None => {
                    self.claims.insert(name.clone(), url.to_string());
                    return Claim::Assigned(name);
                }
                Some(owner) if owner == url => return Claim::Duplicate(name),
                Some(_) => {}
            }
        }

        // Full-hash clash between different URLs; fall back to a counter.
        let mut counter = 2_usize;
        loop {
            let name = format!("{stem}_{hash}_{counter}{PDF_EXTENSION}");
            if !self.claims.contains_key(&name) {
                self.claims.insert(name.clone(), url.to_string());
                return Claim::Assigned(name);
            }
            counter += 1;
        }
    }

    /// Number of names handed out so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether no name has been handed out yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::{Component, Path};

    use super::*;

    fn request(title: &str, url: &str) -> DownloadRequest {
        DownloadRequest::new(title, url)
    }

    #[test]
    fn test_sanitize_title_replaces_spaces_and_symbols() {
        assert_eq!(sanitize_title("AI in Healthcare"), "AI_in_Healthcare");
        assert_eq!(
            sanitize_title("Deep Learning: A Review (2024)"),
            "Deep_Learning_A_Review_2024"
        );
        assert_eq!(sanitize_title("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_sanitize_title_replaces_non_ascii_letters() {
        assert_eq!(sanitize_title("Künstliche Intelligenz"), "K_nstliche_Intelligenz");
        assert_eq!(sanitize_title(&"深度学习".repeat(20)), "");
    }

    #[test]
    fn test_non_ascii_title_falls_back_to_url_stem() {
        let req = request(&"深度学习".repeat(20), "https://example.com/deep-learning.pdf");
        let name = filename_for(&req);
        assert!(name.starts_with("deep-learning_"));
        assert!(name.is_ascii());
    }

    #[test]
    fn test_sanitize_title_trims_dots_and_separators() {
        assert_eq!(sanitize_title("..hidden.."), "hidden");
        assert_eq!(sanitize_title("  --draft--  "), "--draft--");
        assert_eq!(sanitize_title("../../etc/passwd"), "etc_passwd");
    }

    #[test]
    fn test_sanitize_title_only_symbols_is_empty() {
        assert_eq!(sanitize_title("???"), "");
        assert_eq!(sanitize_title(""), "");
    }

    #[test]
    fn test_sanitize_title_truncates_to_limit() {
        let long = "word ".repeat(40);
        let sanitized = sanitize_title(&long);
        assert!(sanitized.chars().count() <= MAX_TITLE_CHARS);
        assert!(!sanitized.ends_with('_'));
    }

    #[test]
    fn test_url_hash_is_stable_hex() {
        let hash = url_hash("https://example.com/a.pdf");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, url_hash("https://example.com/a.pdf"));
        assert_ne!(hash, url_hash("https://example.com/b.pdf"));
    }

    #[test]
    fn test_url_hash_ignores_surrounding_whitespace() {
        assert_eq!(
            url_hash(" https://example.com/a.pdf\n"),
            url_hash("https://example.com/a.pdf")
        );
    }

    #[test]
    fn test_filename_for_uses_title_and_hash_suffix() {
        let req = request("AI in Healthcare", "https://example.com/a.pdf");
        let name = filename_for(&req);
        let hash = url_hash("https://example.com/a.pdf");
        assert_eq!(name, format!("AI_in_Healthcare_{}.pdf", &hash[..8]));
    }

    #[test]
    fn test_filename_for_same_title_different_urls_differ() {
        let a = filename_for(&request("AI in Healthcare", "https://example.com/a.pdf"));
        let b = filename_for(&request("AI in Healthcare", "https://example.com/b.pdf"));
        assert_ne!(a, b);
        assert!(a.starts_with("AI_in_Healthcare_"));
        assert!(b.starts_with("AI_in_Healthcare_"));
    }

    #[test]
    fn test_filename_for_is_deterministic() {
        let req = request("Survey", "https://example.com/s.pdf");
        assert_eq!(filename_for(&req), filename_for(&req.clone()));
    }

    #[test]
    fn test_filename_stem_falls_back_to_url_segment() {
        let req = request("   ", "https://arxiv.org/pdf/2101.00001.pdf");
        assert_eq!(filename_stem(&req), "2101.00001");
    }

    #[test]
    fn test_filename_stem_falls_back_to_host_then_constant() {
        assert_eq!(
            filename_stem(&request("", "https://example.com/")),
            "example.com"
        );
        assert_eq!(filename_stem(&request("!!!", "not a url")), "document");
    }

    #[test]
    fn test_filename_is_single_safe_path_segment() {
        for title in ["../../etc/passwd", "..", ".", "/abs/path", "C:\\windows"] {
            let name = filename_for(&request(title, "https://example.com/x.pdf"));
            let components: Vec<_> = Path::new(&name).components().collect();
            assert_eq!(components.len(), 1, "{name} must be one component");
            assert!(matches!(components[0], Component::Normal(_)), "{name}");
        }
    }

    #[test]
    fn test_title_from_url_decodes_and_strips_extension() {
        assert_eq!(
            title_from_url("https://example.com/papers/Deep%20Learning.PDF"),
            Some("Deep Learning".to_string())
        );
        assert_eq!(
            title_from_url("https://example.com/download?id=3"),
            Some("download".to_string())
        );
        assert_eq!(
            title_from_url("https://example.com/"),
            Some("example.com".to_string())
        );
        assert_eq!(title_from_url("not a url"), None);
    }

    #[test]
    fn test_registry_assigns_then_reports_duplicate_url() {
        let mut registry = FilenameRegistry::new();
        let req = request("Paper", "https://example.com/p.pdf");

        let first = registry.claim(&req);
        let second = registry.claim(&req);

        assert!(matches!(first, Claim::Assigned(_)));
        assert_eq!(second, Claim::Duplicate(first.filename().to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_same_title_different_url_both_assigned() {
        let mut registry = FilenameRegistry::new();
        let a = registry.claim(&request("Paper", "https://example.com/a.pdf"));
        let b = registry.claim(&request("Paper", "https://example.com/b.pdf"));

        assert!(matches!(a, Claim::Assigned(_)));
        assert!(matches!(b, Claim::Assigned(_)));
        assert_ne!(a.filename(), b.filename());
    }

    #[test]
    fn test_registry_widens_hash_when_prefix_taken_by_other_url() {
        let mut registry = FilenameRegistry::new();
        let req = request("Paper", "https://example.com/a.pdf");
        let default_name = filename_for(&req);
        // Simulate an 8-char prefix collision with a different URL.
        registry
            .claims
            .insert(default_name.clone(), "https://other.example/z.pdf".to_string());

        let claim = registry.claim(&req);
        let hash = url_hash(&req.url);
        assert_eq!(claim, Claim::Assigned(format!("Paper_{}.pdf", &hash[..16])));
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = FilenameRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
