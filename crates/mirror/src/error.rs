//! Mirror Error Types
//!
//! Per-version failures (an unreachable upstream, a broken download) are not
//! errors at this level: they are written to the audit logs and reported, and
//! the run carries on. What surfaces here stops a whole library.

use cdnget_storage::error::Error as StorageError;
use cdnget_upstream::error::Error as UpstreamError;
use derive_more::{Display, Error};

/// A mirror error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The mirror store failed; nothing after the failing write was recorded.
    #[display("mirror store error")]
    Cache,
    #[display("content storage error: {_0}")]
    Storage(#[error(not(source))] String),
    #[display("upstream error: {_0}")]
    Upstream(#[error(not(source))] String),
    /// A version filter entry is not a version.
    #[display("invalid version filter: {_0}")]
    InvalidFilter(#[error(not(source))] String),
    /// No service mirrors the library.
    #[display("unknown library: {_0}")]
    UnknownLibrary(#[error(not(source))] String),
    /// A service could not be registered from its configuration.
    #[display("cannot register service: {_0}")]
    Registration(#[error(not(source))] String),
    /// The caller cancelled the run.
    #[display("cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Wrap an upstream failure, keeping its frame as a child.
    #[track_caller]
    pub fn upstream(err: UpstreamError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Upstream(message))
    }

    /// Wrap a storage failure, keeping its frame as a child.
    #[track_caller]
    pub fn storage(err: StorageError) -> Error {
        let message = (*err).to_string();
        err.raise(ErrorKind::Storage(message))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cache | Self::Storage(_) | Self::Upstream(_))
    }
}
