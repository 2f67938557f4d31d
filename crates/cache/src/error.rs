//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// A service failed validation; fix its configuration before retrying.
    #[display("invalid service: {_0}")]
    InvalidService(#[error(not(source))] String),
    /// A service with the same name or directory name is already registered.
    #[display("service already exists: {_0}")]
    AlreadyExists(#[error(not(source))] String),
    /// The service is still referenced by libraries and cannot be deleted.
    #[display("service still in use: {_0}")]
    InUse(#[error(not(source))] String),
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// A write would break a referential-integrity rule.
    #[display("constraint violated: {_0}")]
    Constraint(#[error(not(source))] &'static str),
    /// A stored value could not be converted to or from its model type.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A busy or locked database clears up; bad data and constraint
        // violations do not.
        matches!(self, Self::Database)
    }
}
