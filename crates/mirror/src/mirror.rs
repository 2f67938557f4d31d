use crate::error::{ErrorKind, Result};
use cdnget_cache::Repository;
use cdnget_model::{Library, UpstreamService, VersionValue};
use cdnget_storage::backend::ReadOnlyBackend;
use cdnget_storage::error::ErrorKind as StorageErrorKind;
use cdnget_storage::{BackendHandle, content_path};
use cdnget_upstream::Upstream;
use exn::ResultExt;
use futures::TryStreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Retrievals in flight at once, across every library and service.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// The reconciliation engine.
///
/// Cheap to clone; clones share the store, the content backend, the
/// retrieval permits and the cancellation token.
#[derive(Clone)]
pub struct Mirror {
    pub(crate) repo: Repository,
    pub(crate) content: BackendHandle,
    pub(crate) concurrency: usize,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}
impl Mirror {
    /// In a dry run (decided by the repository) content writes are dropped too.
    pub fn new(repo: Repository, content: BackendHandle) -> Self {
        let content: BackendHandle =
            if repo.is_dry_run() { Arc::new(ReadOnlyBackend::new(content)) } else { content };
        Self {
            repo,
            content,
            concurrency: DEFAULT_CONCURRENCY,
            permits: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self.permits = Arc::new(Semaphore::new(self.concurrency));
        self
    }

    /// Cancelling `token` stops in-flight retrievals; nothing is recorded for them.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn ensure_running(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            exn::bail!(ErrorKind::Cancelled);
        }
        Ok(())
    }

    /// Retrieve `locator` and store the bytes at `path`, returning the size.
    ///
    /// Only the retrieval races the cancellation token: once every byte has
    /// arrived the (atomic) write goes ahead.
    pub(crate) async fn transfer(&self, upstream: &Upstream, locator: &str, path: &Path) -> Result<usize> {
        let retrieve = async {
            let _permit = self.permits.acquire().await.or_raise(|| ErrorKind::Cancelled)?;
            let chunks: Vec<Vec<u8>> = upstream.retrieve(locator).try_collect().await.map_err(ErrorKind::upstream)?;
            Ok::<_, crate::error::Error>(chunks.concat())
        };
        let bytes = tokio::select! {
            biased;
            () = self.cancel.cancelled() => exn::bail!(ErrorKind::Cancelled),
            bytes = retrieve => bytes?,
        };
        self.content.write(path, &bytes).await.map_err(ErrorKind::storage)?;
        tracing::debug!(%locator, path = %path.display(), bytes = bytes.len(), "stored content");
        Ok(bytes.len())
    }

    /// Delete stored bytes that turned out to be unwanted. Missing content is fine.
    pub(crate) async fn discard(&self, path: &Path) {
        match self.content.delete(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "discarded content"),
            Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => {},
            Err(err) => {
                let error = (*err).to_string();
                tracing::warn!(path = %path.display(), %error, "could not discard content");
            },
        }
    }
}

/// Where `value` of `library` lives in the content tree of `service`.
pub(crate) fn content_path_for(
    service: &UpstreamService,
    library: &Library,
    value: &VersionValue,
    locator: &str,
) -> Result<String> {
    let path = content_path(&service.dir_name, &library.name, &value.to_string(), locator).map_err(ErrorKind::storage)?;
    Ok(path.to_string_lossy().into_owned())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::source::MirrorSource;
    use cdnget_cache::Database;
    use cdnget_storage::StorageBackend;
    use cdnget_storage::backend::MockBackend;
    use cdnget_upstream::MockUpstream;

    pub(crate) struct Harness {
        pub mirror: Mirror,
        /// Writes for real even when the mirror runs dry.
        pub store: Repository,
        pub content: Arc<MockBackend>,
        pub db: Database,
    }

    pub(crate) async fn harness() -> Harness {
        harness_with(false).await
    }

    pub(crate) async fn harness_with(dry_run: bool) -> Harness {
        let db = Database::connect_in_memory().await.unwrap();
        let store = Repository::from(&db);
        let content = Arc::new(MockBackend::default());
        let mirror = Mirror::new(Repository::new(db.pool().clone(), dry_run), Arc::clone(&content) as BackendHandle);
        Harness { mirror, store, content, db }
    }

    impl Harness {
        /// Register a service and pair it with a mock upstream.
        pub(crate) async fn source(&self, name: &str, priority: u16, mock: &Arc<MockUpstream>) -> MirrorSource {
            let service = UpstreamService::new(name, name).unwrap().with_priority(priority);
            self.store.create_service(&service).await.unwrap();
            MirrorSource::new(service, MockUpstream::upstream(mock))
        }

        pub(crate) async fn stored(&self, path: &str) -> Option<Vec<u8>> {
            self.content.read(Path::new(path)).await.ok()
        }
    }
}
