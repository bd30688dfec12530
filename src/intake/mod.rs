//! Request intake: turning producer output into [`DownloadRequest`]s.
//!
//! The external research agent is represented only by the
//! [`RequestSource`] trait. [`TextSource`] understands the text formats such
//! agents emit (see [`parse_requests`]); [`StaticSource`] wraps an
//! in-memory list.
//!
//! # Example
//!
//! ```
//! use pdfharvest_core::intake::parse_requests;
//!
//! let result = parse_requests("1. Attention Is All You Need\n   URL: https://arxiv.org/pdf/1706.03762");
//! assert_eq!(result.requests.len(), 1);
//! assert_eq!(result.requests[0].title, "Attention Is All You Need");
//! ```

mod error;
mod parse;
mod request;
mod source;

pub use error::IntakeError;
pub use parse::{ParseResult, parse_requests};
pub use request::DownloadRequest;
pub use source::{RequestSource, StaticSource, TextOrigin, TextSource};
