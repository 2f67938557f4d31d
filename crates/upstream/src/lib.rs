//! Upstream services as seen by the mirror.
//!
//! An [`Upstream`] pairs a [`ListingProvider`], which reports the versions a
//! service publishes for a library, with a [`ContentRetriever`], which
//! streams the bytes behind a version's locator. Transport and
//! authentication for any particular service live behind those two traits.

pub mod error;
mod listing;
mod manifest;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod retrieve;
mod upstream;

pub use crate::listing::{EntryStream, ListingEntry, ListingProvider};
pub use crate::manifest::{ManifestLibrary, ManifestListing, ManifestVersion};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::{MockFailure, MockUpstream};
pub use crate::retrieve::{ContentRetriever, ContentStream, StorageRetriever};
pub use crate::upstream::Upstream;
