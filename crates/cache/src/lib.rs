//! SQLite mirror store.
//!
//! The [`Repository`] is the only way the rest of the workspace reads or
//! writes services, libraries, versions and the two logs. Uniqueness and
//! referential integrity are enforced by the schema itself:
//! - service names and directory names are unique, ignoring case;
//! - library names are unique within a service, ignoring case;
//! - a version is unique per `(service, library, canonical version)`;
//! - log rows reference their version through the full composite key and
//!   can never be updated.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::repo::{InsertOutcome, Repository};
