//! Upstream Error Types
//!
//! Failures here are per-library or per-version: the mirror records them and
//! moves on to the next item, so the kinds describe whether a later run can
//! expect a different result.

use derive_more::{Display, Error};

/// An upstream error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for upstream operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The upstream does not know the library or locator.
    #[display("not found upstream: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The upstream could not be reached.
    #[display("upstream unreachable: {_0}")]
    Network(#[error(not(source))] String),
    /// The upstream refused access to the content.
    #[display("access denied: {_0}")]
    AccessDenied(#[error(not(source))] String),
    /// The content stream broke off part-way.
    #[display("transport error: {_0}")]
    Transport(#[error(not(source))] String),
    /// The upstream answered, but with something unusable.
    #[display("invalid upstream listing: {_0}")]
    InvalidListing(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Transport(_))
    }
}
