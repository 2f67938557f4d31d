//! Domain model for the cdnget mirror.
//!
//! This crate holds the pure types shared by every other crate in the
//! workspace and performs no I/O:
//! - [`version`]: the totally ordered [`VersionValue`](version::VersionValue)
//!   and its numeric [`Token`](version::Token)s.
//! - [`entity`]: upstream services, libraries, mirrored versions and the two
//!   append-only logs.
//! - [`identity`]: composite keys and the lock-guarded navigation slot that
//!   keeps a denormalized key consistent with its cached parent.
//!
//! # Name matching
//!
//! Service and library names match ignoring ASCII case only (`LoDash` is
//! `lodash`, `Éclair` is not `éclair`), the same folding as the store's
//! `NOCASE` collation, so a lookup in memory and one in the store always
//! agree. Version values fold every character with full Unicode lowercasing;
//! they are compared and keyed in Rust alone.

pub mod entity;
pub mod error;
pub mod identity;
pub mod version;

pub use crate::entity::{
    DEFAULT_PRIORITY, Library, LibraryAction, LibraryMetadata, RemoteVersion, ServiceLog, UpstreamService, VersionLog,
};
pub use crate::identity::{LibraryKey, VersionKey};
pub use crate::version::VersionValue;
