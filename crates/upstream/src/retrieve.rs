use crate::error::{ErrorKind, Result};
use cdnget_storage::BackendHandle;
use cdnget_storage::error::ErrorKind as StorageErrorKind;
use async_stream::stream;
use futures::Stream;
use std::path::Path;
use std::pin::Pin;

pub type ContentStream<'a> = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send + 'a>>;

/// Default chunk size for [`StorageRetriever`].
const CHUNK_SIZE: usize = 64 * 1024;

/// Streams the bytes behind a content locator.
///
/// The stream is lazy: nothing is fetched until it is polled, and dropping it
/// abandons the retrieval.
pub trait ContentRetriever: Send + Sync {
    fn retrieve<'a>(&'a self, locator: &'a str) -> ContentStream<'a>;
}

/// Direct download from a storage backend, the locator being a path relative
/// to the backend root.
///
/// # Examples
///
/// ```
/// use cdnget_storage::backend::MockBackend;
/// use cdnget_upstream::{ContentRetriever, StorageRetriever};
/// use futures::TryStreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let origin = Arc::new(MockBackend::with_files([("lodash/4.17.21/lodash.js", b"/* lodash */")]));
/// let retriever = StorageRetriever::new(origin);
/// let chunks: Vec<Vec<u8>> = retriever.retrieve("lodash/4.17.21/lodash.js").try_collect().await?;
/// assert_eq!(chunks.concat(), b"/* lodash */");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StorageRetriever {
    origin: BackendHandle,
    chunk_size: usize,
}
impl StorageRetriever {
    pub fn new(origin: BackendHandle) -> Self {
        Self { origin, chunk_size: CHUNK_SIZE }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn map_error(err: &StorageErrorKind, locator: &str) -> ErrorKind {
        match err {
            StorageErrorKind::NotFound(_) | StorageErrorKind::InvalidPath(_) | StorageErrorKind::InvalidSegment(_) => {
                ErrorKind::NotFound(locator.to_string())
            },
            StorageErrorKind::PermissionDenied(_) => ErrorKind::AccessDenied(locator.to_string()),
            StorageErrorKind::Io(_) | StorageErrorKind::BackendError(_) => ErrorKind::Transport(locator.to_string()),
        }
    }
}
impl ContentRetriever for StorageRetriever {
    fn retrieve<'a>(&'a self, locator: &'a str) -> ContentStream<'a> {
        Box::pin(stream! {
            match self.origin.read(Path::new(locator)).await {
                Ok(bytes) => {
                    tracing::trace!(origin = self.origin.name(), locator, bytes = bytes.len(), "read origin content");
                    for chunk in bytes.chunks(self.chunk_size) {
                        yield Ok(chunk.to_vec());
                    }
                },
                Err(err) => {
                    let kind = Self::map_error(&err, locator);
                    yield Err(err.raise(kind));
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdnget_storage::backend::MockBackend;
    use futures::TryStreamExt;
    use std::sync::Arc;

    fn retriever() -> StorageRetriever {
        let origin = MockBackend::with_files([("lodash/4.17.21/lodash.js", Vec::from(*b"0123456789"))]);
        StorageRetriever::new(Arc::new(origin)).with_chunk_size(4)
    }

    #[tokio::test]
    async fn test_retrieve_in_chunks() {
        let chunks: Vec<Vec<u8>> = retriever().retrieve("lodash/4.17.21/lodash.js").try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), b"0123456789");
    }

    #[tokio::test]
    async fn test_missing_locator() {
        let retriever = retriever();
        let err = retriever.retrieve("lodash/0.0.1/lodash.js").try_collect::<Vec<_>>().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_traversal_is_not_found() {
        let retriever = retriever();
        let err = retriever.retrieve("../secrets").try_collect::<Vec<_>>().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }
}
