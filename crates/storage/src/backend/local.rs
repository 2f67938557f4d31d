//! Local filesystem storage backend.
//!
//! Files are stored under a configured root directory and accessed with
//! `tokio::fs`. Writes go to a temporary sibling first and are renamed into
//! place, so an interrupted retrieval never leaves a partial file behind.

use crate::error::{ErrorKind, Result};
use crate::{StorageBackend, path::validate as validate_path};
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// Suffix of in-flight temporary files.
const PARTIAL_SUFFIX: &str = ".partial";

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use cdnget_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("content", "/srv/cdnget/content")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Content root
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating the root if missing.
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if `root` is relative
    /// or exists but is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Happens once at startup; not worth making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Temporary sibling of `target`, unique within this process.
    fn partial_path(target: &Path) -> PathBuf {
        let file_name = target.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        let counter = PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed);
        target.with_file_name(format!(".{file_name}.{}-{counter}{PARTIAL_SUFFIX}", std::process::id()))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        let partial = Self::partial_path(&abs_path);
        if let Err(e) = fs::write(&partial, data).await {
            let _ = fs::remove_file(&partial).await;
            exn::bail!(Self::map_io_error(e, path));
        }
        if let Err(e) = fs::rename(&partial, &abs_path).await {
            let _ = fs::remove_file(&partial).await;
            exn::bail!(Self::map_io_error(e, path));
        }
        tracing::trace!(backend = %self.name, path = %path.display(), bytes = data.len(), "wrote content");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}
