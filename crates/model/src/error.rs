//! Model Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use uuid::Uuid;

/// A model error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A token suffix began with a digit; that digit belongs to the next token.
    #[display("version token suffix cannot start with a digit: {_0:?}")]
    InvalidSuffix(#[error(not(source))] String),
    /// A raw version string could not be normalized into a version value.
    #[display("invalid version string: {_0:?}")]
    InvalidVersion(#[error(not(source))] String),
    /// A required field was missing or blank after normalization.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// A foreign key field was set to a value that disagrees with the cached
    /// parent reference.
    #[display("identity mismatch on {field}: cached parent has {cached}, attempted {attempted}")]
    IdentityMismatch {
        /// Which part of the composite key was being set.
        field: &'static str,
        /// The identifier held by the cached parent reference.
        cached: Uuid,
        /// The identifier the caller attempted to set.
        attempted: Uuid,
    },
    /// A stored value could not be converted back into a model type.
    #[display("invalid {field} value: {value:?}")]
    InvalidData {
        /// The field that failed to convert.
        field: &'static str,
        /// The offending stored value.
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Model errors are deterministic: the same input fails the same way.
        false
    }
}
