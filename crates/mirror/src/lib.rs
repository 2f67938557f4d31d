//! Reconciliation engine for the cdnget mirror.
//!
//! A [`Mirror`] keeps each registered upstream service's copy of a library in
//! step with what that service lists:
//! - [`Mirror::reconcile`] and [`Mirror::reconcile_library`] add new versions
//!   and record changed artifacts;
//! - [`Mirror::remove`] retires versions on explicit request;
//! - [`Mirror::reload`] retrieves known versions again;
//! - [`Mirror::register_services`] syncs the stored services with their
//!   configuration.
//!
//! Every outcome is written to the audit logs through the
//! [`Repository`](cdnget_cache::Repository), and summarized in a report.

pub mod error;
mod filter;
mod mirror;
mod plan;
mod reconcile;
mod register;
mod reload;
mod remove;
mod report;
mod source;

pub use crate::filter::VersionFilter;
pub use crate::mirror::{DEFAULT_CONCURRENCY, Mirror};
pub use crate::plan::{Decision, Plan, Rejected, plan};
pub use crate::reconcile::MirrorEvent;
pub use crate::register::{Registered, Registration};
pub use crate::report::{Failure, LibraryReport, RemovalReport, Removed, ServiceReport};
pub use crate::source::MirrorSource;
