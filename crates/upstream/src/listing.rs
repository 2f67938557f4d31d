use crate::error::Result;
use async_trait::async_trait;
use cdnget_model::LibraryMetadata;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

pub type EntryStream<'a> = Pin<Box<dyn Stream<Item = Result<ListingEntry>> + Send + 'a>>;

/// One version of a library as reported by an upstream listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    /// The version string exactly as the upstream spells it.
    pub raw: String,
    /// Where the upstream serves this version's content.
    pub locator: String,
    /// Provider-specific payload (integrity hashes, file lists, ...).
    pub metadata: Option<Value>,
}
impl ListingEntry {
    pub fn new(raw: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            locator: locator.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Lists the versions one upstream service publishes for a library.
#[async_trait]
pub trait ListingProvider: Send + Sync {
    /// Library-level display metadata, empty if the upstream has none.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// upstream does not know the library.
    async fn metadata(&self, library: &str) -> Result<LibraryMetadata>;

    /// Lazily stream every version of `library`, page by page.
    ///
    /// A failure part-way through ends the stream with an error; entries
    /// yielded before it remain valid.
    fn entries<'a>(&'a self, library: &'a str) -> EntryStream<'a>;
}
