//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files live in a map behind a [`RwLock`], so every trait method works on
/// `&self`.
///
/// # Examples
///
/// Requires the `mock` feature.
///
/// ```ignore
/// use cdnget_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("cdnjs/lodash/4.17.21/lodash.js", b"/* lodash */")]);
/// assert_eq!(backend.read(Path::new("cdnjs/lodash/4.17.21/lodash.js")).await?, b"/* lodash */");
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}
impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation: broken test setup should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Every stored path, in order.
    pub async fn paths(&self) -> Vec<PathBuf> {
        self.storage.read().await.keys().cloned().collect()
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        let data = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(data.clone())
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.insert(path, data.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_delete() {
        let backend = MockBackend::default();
        backend.write(Path::new("a/b.js"), b"hello").await.unwrap();
        assert_eq!(backend.read(Path::new("a/b.js")).await.unwrap(), b"hello");
        backend.delete(Path::new("a/b.js")).await.unwrap();
        let err = backend.read(Path::new("a/b.js")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_paths_are_normalized() {
        let backend = MockBackend::with_files([
            ("cdnjs/lodash/1.0/a.js", Vec::from(*b"a")),
            ("unpkg//lodash/./1.0/a.js", Vec::from(*b"b")),
        ]);
        let expected = [PathBuf::from("cdnjs/lodash/1.0/a.js"), PathBuf::from("unpkg/lodash/1.0/a.js")];
        assert_eq!(backend.paths().await, expected);
        assert_eq!(backend.read(Path::new("unpkg/lodash/1.0/a.js")).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let backend = MockBackend::default();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../escape"), b"bad").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", Vec::from(*b"bad"))]);
    }
}
