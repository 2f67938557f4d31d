use crate::error::Result;
use crate::listing::{EntryStream, ListingProvider};
use crate::manifest::ManifestListing;
use crate::retrieve::{ContentRetriever, ContentStream, StorageRetriever};
use cdnget_model::LibraryMetadata;
use cdnget_storage::BackendHandle;
use std::sync::Arc;

/// Everything the mirror needs from one upstream service: a way to list
/// versions and a way to fetch their content.
///
/// The two halves are independent, so a provider-specific listing can be
/// paired with any retriever, and one type may serve as both.
#[derive(Clone)]
pub struct Upstream {
    listing: Arc<dyn ListingProvider>,
    retriever: Arc<dyn ContentRetriever>,
}
impl Upstream {
    pub fn new(listing: Arc<dyn ListingProvider>, retriever: Arc<dyn ContentRetriever>) -> Self {
        Self { listing, retriever }
    }

    /// A static manifest whose locators are paths under `origin`.
    pub fn manifest(listing: ManifestListing, origin: BackendHandle) -> Self {
        Self::new(Arc::new(listing), Arc::new(StorageRetriever::new(origin)))
    }

    pub async fn metadata(&self, library: &str) -> Result<LibraryMetadata> {
        self.listing.metadata(library).await
    }

    pub fn entries<'a>(&'a self, library: &'a str) -> EntryStream<'a> {
        self.listing.entries(library)
    }

    pub fn retrieve<'a>(&'a self, locator: &'a str) -> ContentStream<'a> {
        self.retriever.retrieve(locator)
    }
}
