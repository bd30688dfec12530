//! Planning pass run before any network traffic.
//!
//! Walks the requests in input order, rejects invalid URLs and claims a
//! filename for every other request. Both real runs and dry-run previews go
//! through [`plan_requests`], so a preview names exactly the files a run
//! would write.

use std::collections::HashMap;

use tracing::{info, warn};

use super::error::DownloadError;
use super::fetcher::validate_url;
use super::filename::{Claim, FilenameRegistry};
use crate::intake::DownloadRequest;

/// What the run does with one request.
#[derive(Debug)]
pub enum PlanStep {
    /// Fetch the URL and commit it under `filename`.
    Fetch {
        /// Name claimed for this request.
        filename: String,
    },
    /// Same URL as the request at index `first`; that request's outcome decides this one.
    Repeat {
        /// Index of the earlier request with the same URL.
        first: usize,
        /// Name claimed by the earlier request.
        filename: String,
    },
    /// Never fetched.
    Reject(DownloadError),
}

impl PlanStep {
    /// Filename this step writes or refers to; `None` for rejected requests.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Fetch { filename } | Self::Repeat { filename, .. } => Some(filename),
            Self::Reject(_) => None,
        }
    }
}

/// Plans every request, returning one step per request in input order.
#[must_use]
pub fn plan_requests(requests: &[DownloadRequest]) -> Vec<PlanStep> {
    let mut registry = FilenameRegistry::new();
    let mut owners: HashMap<String, usize> = HashMap::new();

    requests
        .iter()
        .enumerate()
        .map(|(index, request)| {
            if let Err(error) = validate_url(&request.url) {
                warn!(title = %request.title, error = %error, "rejecting request");
                return PlanStep::Reject(error);
            }

            match registry.claim(request) {
                Claim::Assigned(filename) => {
                    owners.insert(filename.clone(), index);
                    PlanStep::Fetch { filename }
                }
                Claim::Duplicate(filename) => {
                    info!(url = %request.url, filename = %filename, "duplicate request in this run");
                    let first = owners.get(&filename).copied().unwrap_or(index);
                    PlanStep::Repeat { first, filename }
                }
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::ErrorKind;

    #[test]
    fn test_plan_assigns_names_in_input_order() {
        let requests = vec![
            DownloadRequest::new("Paper", "https://example.com/a.pdf"),
            DownloadRequest::new("Paper", "https://example.com/b.pdf"),
        ];
        let steps = plan_requests(&requests);

        assert!(matches!(steps[0], PlanStep::Fetch { .. }));
        assert!(matches!(steps[1], PlanStep::Fetch { .. }));
        assert_ne!(steps[0].filename(), steps[1].filename());
    }

    #[test]
    fn test_plan_points_repeats_at_first_occurrence() {
        let requests = vec![
            DownloadRequest::new("Other", "https://example.com/x.pdf"),
            DownloadRequest::new("Paper", "https://example.com/a.pdf"),
            DownloadRequest::new("Paper", "https://example.com/a.pdf"),
            DownloadRequest::new("Paper", "https://example.com/a.pdf"),
        ];
        let steps = plan_requests(&requests);

        for step in &steps[2..] {
            let PlanStep::Repeat { first, filename } = step else {
                panic!("expected repeat, got {step:?}");
            };
            assert_eq!(*first, 1);
            assert_eq!(Some(filename.as_str()), steps[1].filename());
        }
    }

    #[test]
    fn test_plan_rejects_invalid_urls_without_claiming() {
        let requests = vec![
            DownloadRequest::new("Broken", "ftp://example.com/a.pdf"),
            DownloadRequest::new("", ""),
        ];
        let steps = plan_requests(&requests);

        for step in &steps {
            let PlanStep::Reject(error) = step else {
                panic!("expected reject, got {step:?}");
            };
            assert_eq!(error.kind(), ErrorKind::InvalidUrl);
            assert_eq!(step.filename(), None);
        }
    }
}
