//! Static listings, one manifest per upstream service.

use crate::error::{ErrorKind, Result};
use crate::listing::{EntryStream, ListingEntry, ListingProvider};
use async_stream::stream;
use async_trait::async_trait;
use cdnget_model::LibraryMetadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Entries handed out per page.
const PAGE_SIZE: usize = 50;

/// One library in a manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestLibrary {
    /// Display name, when it differs from the manifest key.
    pub name: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    pub versions: Vec<ManifestVersion>,
}
impl ManifestLibrary {
    fn metadata(&self) -> LibraryMetadata {
        let mut metadata = LibraryMetadata::default();
        if let Some(name) = &self.name {
            metadata = metadata.with_name(name);
        }
        if let Some(description) = &self.description {
            metadata = metadata.with_description(description);
        }
        if let Some(homepage) = &self.homepage {
            metadata = metadata.with_homepage(homepage);
        }
        if let Some(license) = &self.license {
            metadata = metadata.with_license(license);
        }
        metadata
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestVersion {
    pub version: String,
    /// Path of the content relative to the service's origin.
    pub locator: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}
impl From<&ManifestVersion> for ListingEntry {
    fn from(version: &ManifestVersion) -> Self {
        Self {
            raw: version.version.clone(),
            locator: version.locator.clone(),
            metadata: version.metadata.clone(),
        }
    }
}

/// Lists libraries from a static manifest. Library names match ignoring
/// case.
///
/// # Examples
///
/// ```
/// use cdnget_upstream::{ListingProvider, ManifestLibrary, ManifestListing, ManifestVersion};
/// use futures::TryStreamExt;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let lodash = ManifestLibrary {
///     versions: vec![ManifestVersion {
///         version: "4.17.21".to_string(),
///         locator: "lodash/4.17.21/lodash.min.js".to_string(),
///         metadata: None,
///     }],
///     ..ManifestLibrary::default()
/// };
/// let listing = ManifestListing::new([("lodash".to_string(), lodash)]);
/// let entries: Vec<_> = listing.entries("Lodash").try_collect().await?;
/// assert_eq!(entries[0].raw, "4.17.21");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManifestListing {
    libraries: BTreeMap<String, ManifestLibrary>,
    page_size: usize,
}
impl ManifestListing {
    pub fn new(libraries: impl IntoIterator<Item = (String, ManifestLibrary)>) -> Self {
        Self {
            libraries: libraries.into_iter().collect(),
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Manifest keys, in order.
    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }

    fn find(&self, library: &str) -> Result<&ManifestLibrary> {
        let library = library.trim();
        self.libraries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(library))
            .map(|(_, found)| found)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(library.to_string())))
    }
}

#[async_trait]
impl ListingProvider for ManifestListing {
    async fn metadata(&self, library: &str) -> Result<LibraryMetadata> {
        Ok(self.find(library)?.metadata())
    }

    fn entries<'a>(&'a self, library: &'a str) -> EntryStream<'a> {
        Box::pin(stream! {
            match self.find(library) {
                Ok(found) => {
                    for (number, page) in found.versions.chunks(self.page_size.max(1)).enumerate() {
                        tracing::trace!(library, page = number, entries = page.len(), "manifest page");
                        for version in page {
                            yield Ok(ListingEntry::from(version));
                        }
                    }
                },
                Err(err) => yield Err(err),
            }
        })
    }
}
