//! Read-only storage backend.
//!
//! Wraps another backend for dry runs: reads pass through, writes and
//! deletes are logged and reported as successful without touching anything.

use crate::{BackendHandle, StorageBackend, error::Result};
use async_trait::async_trait;
use std::path::Path;

/// Read-only storage backend.
///
/// Wraps another backend and silently drops all write operations, logging an
/// [`info event`](tracing::Event).
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        crate::validate_path(path)?;
        tracing::info!(backend = self.name(), path = %path.display(), bytes = data.len(), "Skipping write during dry run");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        crate::validate_path(path)?;
        tracing::info!(backend = self.name(), path = %path.display(), "Skipping delete during dry run");
        Ok(())
    }
}
