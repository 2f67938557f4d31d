use super::{InsertOutcome, Repository};
use crate::error::{ErrorKind, Result};
use crate::models::{VersionLogRow, VersionRow};
use cdnget_model::{LibraryKey, RemoteVersion, VersionLog, VersionValue};
use exn::ResultExt;
use sqlx::SqliteConnection;
use tracing::instrument;
use uuid::Uuid;

impl Repository {
    /// Create a version row together with its first log entry.
    ///
    /// Both writes commit in one transaction. If an equal version (same
    /// service, library and version value) is already stored, nothing is
    /// written and [`InsertOutcome::AlreadyPresent`] is returned.
    ///
    /// Returns [`ErrorKind::Constraint`] if the log is keyed to another
    /// version.
    #[instrument(skip_all, fields(version = %version.value))]
    pub async fn record_version(&self, version: &RemoteVersion, log: &VersionLog) -> Result<InsertOutcome> {
        if log.key() != version.key() {
            exn::bail!(ErrorKind::Constraint("log is keyed to another version"));
        }
        if self.dry_run {
            return Ok(InsertOutcome::Inserted);
        }
        let row = VersionRow::try_from(version)?;
        let log_row = VersionLogRow::try_from(log)?;
        let mut tx = self.begin().await?;
        let result = sqlx::query(include_str!("../../queries/insert_version.sql"))
            .bind(row.id)
            .bind(row.service_id)
            .bind(row.library_id)
            .bind(row.version_key)
            .bind(row.raw)
            .bind(row.locator)
            .bind(row.provider_data)
            .bind(row.content_path)
            .bind(row.retrieved_on)
            .bind(row.retired_on)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let outcome = InsertOutcome::from_result(&result);
        if !outcome.is_inserted() {
            tx.rollback().await.or_raise(|| ErrorKind::Database)?;
            tracing::debug!("version already present");
            return Ok(outcome);
        }
        Self::insert_log(&mut *tx, log_row).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(outcome)
    }

    /// Mark a version as retired and record why, in one transaction.
    ///
    /// Returns `false`, writing nothing, if the version was already retired.
    #[instrument(skip_all, fields(version = %version.value))]
    pub async fn retire_version(&self, version: &RemoteVersion, log: &VersionLog) -> Result<bool> {
        if log.key() != version.key() {
            exn::bail!(ErrorKind::Constraint("log is keyed to another version"));
        }
        if self.dry_run {
            return Ok(!version.is_retired());
        }
        let log_row = VersionLogRow::try_from(log)?;
        let mut tx = self.begin().await?;
        let result = sqlx::query(include_str!("../../queries/retire_version.sql"))
            .bind(log_row.timestamp)
            .bind(version.id.to_string())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            tx.rollback().await.or_raise(|| ErrorKind::Database)?;
            return Ok(false);
        }
        Self::insert_log(&mut *tx, log_row).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(true)
    }

    /// Record a fresh retrieval of a known version, clearing its retirement
    /// marker if it had one. The log and the reinstatement commit together.
    #[instrument(skip_all, fields(version = %version.value))]
    pub async fn record_reload(&self, version: &RemoteVersion, log: &VersionLog) -> Result<()> {
        if log.key() != version.key() {
            exn::bail!(ErrorKind::Constraint("log is keyed to another version"));
        }
        if self.dry_run {
            return Ok(());
        }
        let log_row = VersionLogRow::try_from(log)?;
        let mut tx = self.begin().await?;
        let result = sqlx::query(include_str!("../../queries/reinstate_version.sql"))
            .bind(version.id.to_string())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() > 0 {
            tracing::info!("reinstated retired version");
        }
        Self::insert_log(&mut *tx, log_row).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub(super) async fn insert_log(conn: &mut SqliteConnection, row: VersionLogRow) -> Result<()> {
        sqlx::query(include_str!("../../queries/insert_version_log.sql"))
            .bind(row.id)
            .bind(row.version_id)
            .bind(row.library_id)
            .bind(row.service_id)
            .bind(row.action)
            .bind(row.message)
            .bind(row.event_id)
            .bind(row.url)
            .bind(row.provider_data)
            .bind(row.timestamp)
            .execute(conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Look up the version of a library equal to `value`, retired or not.
    pub async fn get_version(&self, library: LibraryKey, value: &VersionValue) -> Result<Option<RemoteVersion>> {
        let row: Option<VersionRow> = sqlx::query_as(include_str!("../../queries/get_version_by_key.sql"))
            .bind(library.service_id.to_string())
            .bind(library.library_id.to_string())
            .bind(value.key())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(RemoteVersion::try_from).transpose()
    }

    pub async fn get_version_by_id(&self, id: Uuid) -> Result<Option<RemoteVersion>> {
        let row: Option<VersionRow> = sqlx::query_as(include_str!("../../queries/get_version_by_id.sql"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(RemoteVersion::try_from).transpose()
    }

    /// Every version of a library, retired ones included, highest first.
    pub async fn list_known_versions(&self, library: LibraryKey) -> Result<Vec<RemoteVersion>> {
        let rows: Vec<VersionRow> = sqlx::query_as(include_str!("../../queries/list_versions_for_library.sql"))
            .bind(library.service_id.to_string())
            .bind(library.library_id.to_string())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut versions = rows.into_iter().map(RemoteVersion::try_from).collect::<Result<Vec<_>>>()?;
        // SQLite cannot order by version value; the collation lives in Rust.
        versions.sort_by(|a, b| b.value.cmp(&a.value));
        Ok(versions)
    }

    /// Active versions of a library, highest first.
    pub async fn list_versions(&self, library: LibraryKey) -> Result<Vec<RemoteVersion>> {
        let mut versions = self.list_known_versions(library).await?;
        versions.retain(|version| !version.is_retired());
        Ok(versions)
    }

    /// The highest active version of a library.
    pub async fn highest_version(&self, library: LibraryKey) -> Result<Option<RemoteVersion>> {
        Ok(self.list_versions(library).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::fixtures;
    use cdnget_model::LibraryAction;
    use futures::future::join_all;

    #[tokio::test]
    async fn test_record_and_get() {
        let repo = fixtures::repository().await;
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        let version = fixtures::version(&repo, &library, "4.17.21").await;
        let value = VersionValue::parse("4.17.21").unwrap();
        assert_eq!(repo.get_version(library.key(), &value).await.unwrap(), Some(version.clone()));
        assert_eq!(repo.get_version_by_id(version.id).await.unwrap(), Some(version));
    }

    #[tokio::test]
    async fn test_equal_values_are_duplicates() {
        let repo = fixtures::repository().await;
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        fixtures::version(&repo, &library, "1.0.0-RC1").await;
        let duplicate = RemoteVersion::new(library.key(), "01.0.0-rc1", "https://cdn.example/other.js").unwrap();
        let log = VersionLog::new(duplicate.key(), LibraryAction::Added, "added");
        assert_eq!(repo.record_version(&duplicate, &log).await.unwrap(), InsertOutcome::AlreadyPresent);
        assert_eq!(repo.list_known_versions(library.key()).await.unwrap().len(), 1);
        // The rolled back log must not survive either.
        assert_eq!(repo.list_logs_for_library(library.key()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_insert_once() {
        let db = crate::Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        let attempts: Vec<_> = (0..4)
            .map(|i| {
                let version = RemoteVersion::new(library.key(), "2.0.0", format!("https://cdn.example/{i}.js")).unwrap();
                let log = VersionLog::new(version.key(), LibraryAction::Added, "added");
                (version, log)
            })
            .collect();
        let outcomes = join_all(attempts.iter().map(|(version, log)| repo.record_version(version, log))).await;
        let inserted = outcomes.into_iter().map(Result::unwrap).filter(InsertOutcome::is_inserted).count();
        assert_eq!(inserted, 1);
        assert_eq!(repo.list_known_versions(library.key()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_log_for_other_version_rejected() {
        let repo = fixtures::repository().await;
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        let version = RemoteVersion::new(library.key(), "1.0", "https://cdn.example/a.js").unwrap();
        let log = VersionLog::new(library.key().version(Uuid::new_v4()), LibraryAction::Added, "added");
        let err = repo.record_version(&version, &log).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Constraint(_)));
    }

    #[tokio::test]
    async fn test_versions_ordered_descending() {
        let repo = fixtures::repository().await;
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        for raw in ["1.2", "1.10.0", "1.2.0", "1.9", "1.2.1", "1.0-beta"] {
            fixtures::version(&repo, &library, raw).await;
        }
        let raws: Vec<String> =
            repo.list_versions(library.key()).await.unwrap().into_iter().map(|version| version.raw).collect();
        assert_eq!(raws, ["1.10.0", "1.9", "1.2.1", "1.2.0", "1.2", "1.0-beta"]);
        let highest = repo.highest_version(library.key()).await.unwrap().unwrap();
        assert_eq!(highest.raw, "1.10.0");
    }

    #[tokio::test]
    async fn test_retire_and_reload() {
        let repo = fixtures::repository().await;
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        let old = fixtures::version(&repo, &library, "3.0.0").await;
        let new = fixtures::version(&repo, &library, "4.0.0").await;

        let removed = VersionLog::new(new.key(), LibraryAction::Removed, "operator removal");
        assert!(repo.retire_version(&new, &removed).await.unwrap());
        let again = VersionLog::new(new.key(), LibraryAction::Removed, "operator removal");
        assert!(!repo.retire_version(&new, &again).await.unwrap());

        let highest = repo.highest_version(library.key()).await.unwrap().unwrap();
        assert_eq!(highest.id, old.id);
        assert_eq!(repo.list_known_versions(library.key()).await.unwrap().len(), 2);
        let stored = repo.get_version_by_id(new.id).await.unwrap().unwrap();
        assert!(stored.is_retired());

        let reload = VersionLog::new(new.key(), LibraryAction::Reload, "reloaded").with_url(&new.locator);
        repo.record_reload(&stored, &reload).await.unwrap();
        assert!(!repo.get_version_by_id(new.id).await.unwrap().unwrap().is_retired());
        let actions: Vec<LibraryAction> =
            repo.list_logs_for_library(library.key()).await.unwrap().iter().map(|log| log.action).collect();
        assert_eq!(
            actions,
            [LibraryAction::Added, LibraryAction::Added, LibraryAction::Removed, LibraryAction::Reload]
        );
    }

    #[tokio::test]
    async fn test_version_row_is_immutable() {
        let db = crate::Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        let version = fixtures::version(&repo, &library, "1.0").await;
        let result = sqlx::query("UPDATE versions SET locator = 'elsewhere' WHERE id = ?")
            .bind(version.id.to_string())
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_records_nothing() {
        let db = crate::Database::connect_in_memory().await.unwrap();
        let (_service, library) = fixtures::library(&Repository::from(&db), "cdnjs", "lodash").await;
        let repo = Repository::new(db.pool().clone(), true);
        let version = RemoteVersion::new(library.key(), "1.0", "https://cdn.example/a.js").unwrap();
        let log = VersionLog::new(version.key(), LibraryAction::Added, "added");
        assert!(repo.record_version(&version, &log).await.unwrap().is_inserted());
        assert!(repo.list_known_versions(library.key()).await.unwrap().is_empty());
    }
}
