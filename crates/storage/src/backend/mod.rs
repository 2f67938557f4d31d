//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the single interface the
//! mirror uses to persist and remove retrieved content.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for content storage.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cdnget_storage::{backend::StorageBackend, content_path, error::Result};
///
/// async fn mirror_file(backend: &dyn StorageBackend, bytes: &[u8]) -> Result<usize> {
///     let path = content_path("cdnjs", "lodash", "4.17.21", "lodash.min.js")?;
///     backend.write(&path, bytes).await?;
///     Ok(backend.read(&path).await?.len())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating parent directories as needed.
    ///
    /// The write is all-or-nothing: readers observe either the previous
    /// contents or the complete new contents, never a partial file.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;
}
