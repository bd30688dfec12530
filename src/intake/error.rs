//! Error types for request intake.

use thiserror::Error;

/// Errors raised while collecting requests from a producer.
///
/// Malformed individual lines are not errors; they are reported as skipped
/// input in [`ParseResult`](super::ParseResult).
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The input could not be read.
    #[error("cannot read input from {origin}: {source}\n  Suggestion: check the path and permissions")]
    Read {
        /// Where the input was read from (a path, or `stdin`).
        origin: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl IntakeError {
    /// Creates a read error for `origin`.
    pub fn read(origin: impl Into<String>, source: std::io::Error) -> Self {
        Self::Read {
            origin: origin.into(),
            source,
        }
    }
}
