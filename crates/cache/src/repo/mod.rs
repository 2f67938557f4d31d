//! Repository for the mirror graph: services, libraries, versions and logs.
//!
//! The repository is the only way the reconciliation engine reads or writes
//! mirror state. Versions are created through [`Repository::record_version`],
//! which inserts the row and its first log entry in one transaction; apart
//! from the retirement marker a version row is never written again.

mod library;
mod log;
mod service;
mod version;

use crate::Database;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteQueryResult;

/// Outcome of inserting a row guarded by a uniqueness constraint.
///
/// Two reconciliation runs racing on the same version are expected, so losing
/// the race is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An equal row was already stored; nothing was written.
    AlreadyPresent,
}
impl InsertOutcome {
    fn from_result(result: &SqliteQueryResult) -> Self {
        if result.rows_affected() > 0 { Self::Inserted } else { Self::AlreadyPresent }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// In a dry run every write is accepted and discarded, so reconciliation
    /// decisions can be previewed against real state.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn is_unique_violation(err: &sqlx::Error) -> bool {
        err.as_database_error().is_some_and(|db_err| db_err.is_unique_violation())
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.pool.begin().await.or_raise(|| ErrorKind::Database)
    }
}
