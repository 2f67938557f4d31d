//! Scriptable upstream for testing.

use crate::error::{ErrorKind, Result};
use crate::listing::{EntryStream, ListingEntry, ListingProvider};
use crate::retrieve::{ContentRetriever, ContentStream};
use crate::upstream::Upstream;
use async_stream::stream;
use async_trait::async_trait;
use cdnget_model::LibraryMetadata;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const CHUNK_SIZE: usize = 4096;

/// A failure [`MockUpstream`] can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    NotFound,
    Network,
    AccessDenied,
    Transport,
}
impl MockFailure {
    fn kind(self, subject: &str) -> ErrorKind {
        let subject = subject.to_string();
        match self {
            Self::NotFound => ErrorKind::NotFound(subject),
            Self::Network => ErrorKind::Network(subject),
            Self::AccessDenied => ErrorKind::AccessDenied(subject),
            Self::Transport => ErrorKind::Transport(subject),
        }
    }
}

#[derive(Default)]
struct MockLibrary {
    metadata: LibraryMetadata,
    entries: Vec<ListingEntry>,
}

#[derive(Default)]
struct State {
    libraries: BTreeMap<String, MockLibrary>,
    content: HashMap<String, Vec<u8>>,
    /// Metadata failure per library; the listing itself is unaffected.
    metadata_failures: HashMap<String, MockFailure>,
    /// Listing failure per library, after that many entries.
    listing_failures: HashMap<String, (MockFailure, usize)>,
    /// Retrieval failure per locator, for that many attempts.
    retrieval_failures: HashMap<String, (MockFailure, usize)>,
    stalled: HashSet<String>,
    retrievals: HashMap<String, usize>,
}

/// An in-memory upstream serving both listings and content.
///
/// Everything can be changed while it is shared, so tests can publish a new
/// version between two reconciliation runs.
///
/// # Examples
///
/// Requires the `mock` feature.
///
/// ```ignore
/// use cdnget_upstream::MockUpstream;
/// use futures::TryStreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mock = Arc::new(MockUpstream::default());
/// mock.publish("lodash", "4.17.21", "lodash/4.17.21/lodash.js", b"/* lodash */");
/// let upstream = MockUpstream::upstream(&mock);
/// let entries: Vec<_> = upstream.entries("lodash").try_collect().await?;
/// assert_eq!(entries.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockUpstream {
    state: Mutex<State>,
    page_size: usize,
}
impl Default for MockUpstream {
    fn default() -> Self {
        Self {
            state: Mutex::default(),
            page_size: 10,
        }
    }
}
impl MockUpstream {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Share the mock as an [`Upstream`].
    pub fn upstream(this: &Arc<Self>) -> Upstream {
        Upstream::new(Arc::clone(this) as Arc<dyn ListingProvider>, Arc::clone(this) as Arc<dyn ContentRetriever>)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(library: &str) -> String {
        library.trim().to_ascii_lowercase()
    }

    /// Set the library-level metadata, registering the library if needed.
    pub fn describe(&self, library: &str, metadata: LibraryMetadata) {
        self.state().libraries.entry(Self::key(library)).or_default().metadata = metadata;
    }

    /// Add a version to a library's listing and serve `content` at `locator`.
    pub fn publish(&self, library: &str, raw: &str, locator: &str, content: impl Into<Vec<u8>>) {
        self.publish_entry(library, ListingEntry::new(raw, locator), content);
    }

    pub fn publish_entry(&self, library: &str, entry: ListingEntry, content: impl Into<Vec<u8>>) {
        let mut state = self.state();
        state.content.insert(entry.locator.clone(), content.into());
        state.libraries.entry(Self::key(library)).or_default().entries.push(entry);
    }

    /// Replace the listing entry for `raw`, serving new content at a new
    /// locator: the same version number with a different artifact.
    pub fn republish(&self, library: &str, raw: &str, locator: &str, content: impl Into<Vec<u8>>) {
        let mut state = self.state();
        state.content.insert(locator.to_string(), content.into());
        if let Some(found) = state.libraries.get_mut(&Self::key(library)) {
            for entry in found.entries.iter_mut().filter(|entry| entry.raw == raw) {
                entry.locator = locator.to_string();
            }
        }
    }

    /// Drop a version from the listing, keeping its content reachable.
    pub fn unlist(&self, library: &str, raw: &str) {
        if let Some(found) = self.state().libraries.get_mut(&Self::key(library)) {
            found.entries.retain(|entry| entry.raw != raw);
        }
    }

    /// Fail the listing of `library` after yielding `after` entries.
    pub fn fail_listing(&self, library: &str, failure: MockFailure, after: usize) {
        self.state().listing_failures.insert(Self::key(library), (failure, after));
    }

    /// Fail metadata requests for `library` while still serving its listing.
    pub fn fail_metadata(&self, library: &str, failure: MockFailure) {
        self.state().metadata_failures.insert(Self::key(library), failure);
    }

    pub fn restore_listing(&self, library: &str) {
        self.state().listing_failures.remove(&Self::key(library));
    }

    /// Fail the next `times` retrievals of `locator`.
    pub fn fail_retrieval(&self, locator: &str, failure: MockFailure, times: usize) {
        self.state().retrieval_failures.insert(locator.to_string(), (failure, times));
    }

    /// Make retrievals of `locator` hang until they are dropped.
    pub fn stall_retrieval(&self, locator: &str) {
        self.state().stalled.insert(locator.to_string());
    }

    /// How many times `locator` has been requested.
    pub fn retrievals(&self, locator: &str) -> usize {
        self.state().retrievals.get(locator).copied().unwrap_or_default()
    }

    fn snapshot(&self, library: &str) -> Option<(Vec<ListingEntry>, Option<(MockFailure, usize)>)> {
        let state = self.state();
        let key = Self::key(library);
        let failure = state.listing_failures.get(&key).copied();
        match state.libraries.get(&key) {
            Some(found) => Some((found.entries.clone(), failure)),
            None => failure.map(|failure| (Vec::new(), Some(failure))),
        }
    }

    /// Record the request and decide its outcome.
    fn begin_retrieval(&self, locator: &str) -> (bool, Result<Vec<u8>>) {
        let mut state = self.state();
        *state.retrievals.entry(locator.to_string()).or_default() += 1;
        let stalled = state.stalled.contains(locator);
        if let Some((failure, remaining)) = state.retrieval_failures.get_mut(locator)
            && *remaining > 0
        {
            *remaining -= 1;
            return (stalled, Err(exn::Exn::from(failure.kind(locator))));
        }
        let content = state.content.get(locator).cloned();
        (stalled, content.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(locator.to_string()))))
    }
}

#[async_trait]
impl ListingProvider for MockUpstream {
    async fn metadata(&self, library: &str) -> Result<LibraryMetadata> {
        let state = self.state();
        let key = Self::key(library);
        if let Some(failure) = state.metadata_failures.get(&key) {
            exn::bail!(failure.kind(library));
        }
        if let Some((failure, 0)) = state.listing_failures.get(&key) {
            exn::bail!(failure.kind(library));
        }
        match state.libraries.get(&key) {
            Some(found) => Ok(found.metadata.clone()),
            None => exn::bail!(ErrorKind::NotFound(library.to_string())),
        }
    }

    fn entries<'a>(&'a self, library: &'a str) -> EntryStream<'a> {
        let snapshot = self.snapshot(library);
        let page_size = self.page_size;
        Box::pin(stream! {
            match snapshot {
                Some((entries, failure)) => {
                    let fail_at = failure.map(|(failure, after)| (failure, after.min(entries.len())));
                    let available = fail_at.map_or(entries.len(), |(_, after)| after);
                    for page in entries[..available].chunks(page_size) {
                        for entry in page {
                            yield Ok(entry.clone());
                        }
                    }
                    if let Some((failure, _)) = fail_at {
                        yield Err(exn::Exn::from(failure.kind(library)));
                    }
                },
                None => yield Err(exn::Exn::from(ErrorKind::NotFound(library.to_string()))),
            }
        })
    }
}

impl ContentRetriever for MockUpstream {
    fn retrieve<'a>(&'a self, locator: &'a str) -> ContentStream<'a> {
        Box::pin(stream! {
            let (stalled, outcome) = self.begin_retrieval(locator);
            if stalled {
                futures::future::pending::<()>().await;
            }
            match outcome {
                Ok(content) => {
                    for chunk in content.chunks(CHUNK_SIZE) {
                        yield Ok(chunk.to_vec());
                    }
                },
                Err(err) => yield Err(err),
            }
        })
    }
}
