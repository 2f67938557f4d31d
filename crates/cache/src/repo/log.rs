use super::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{ServiceLogRow, VersionLogRow};
use cdnget_model::{LibraryKey, RemoteVersion, ServiceLog, VersionLog};
use exn::ResultExt;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

impl Repository {
    /// Append an entry to the log of an existing version.
    pub async fn append_log(&self, log: &VersionLog) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        let row = VersionLogRow::try_from(log)?;
        let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Database)?;
        Self::insert_log(&mut *conn, row).await
    }

    /// The log of one version, oldest first, each entry resolved to `version`.
    pub async fn list_logs_for_version(&self, version: Arc<RemoteVersion>) -> Result<Vec<VersionLog>> {
        let rows: Vec<VersionLogRow> = sqlx::query_as(include_str!("../../queries/list_logs_for_version.sql"))
            .bind(version.service_id.to_string())
            .bind(version.library_id.to_string())
            .bind(version.id.to_string())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter()
            .map(|row| {
                let log = VersionLog::try_from(row)?;
                log.set_version(Arc::clone(&version));
                Ok(log)
            })
            .collect()
    }

    /// The log of every version of a library, oldest first.
    pub async fn list_logs_for_library(&self, library: LibraryKey) -> Result<Vec<VersionLog>> {
        let rows: Vec<VersionLogRow> = sqlx::query_as(include_str!("../../queries/list_logs_for_library.sql"))
            .bind(library.service_id.to_string())
            .bind(library.library_id.to_string())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(VersionLog::try_from).collect()
    }

    /// The latest `added`, `updated` or `reload` entry of every version of a
    /// library, keyed by version id.
    ///
    /// Version rows never change, so this is the artifact as recorded at its
    /// last retrieval.
    pub async fn latest_retrievals(&self, library: LibraryKey) -> Result<HashMap<Uuid, VersionLog>> {
        let rows: Vec<VersionLogRow> = sqlx::query_as(include_str!("../../queries/latest_retrievals.sql"))
            .bind(library.service_id.to_string())
            .bind(library.library_id.to_string())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter()
            .map(|row| {
                let log = VersionLog::try_from(row)?;
                Ok((log.version_id(), log))
            })
            .collect()
    }

    /// Append an entry to a service's access log.
    pub async fn append_service_log(&self, log: &ServiceLog) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        let row = ServiceLogRow::from(log);
        sqlx::query(include_str!("../../queries/insert_service_log.sql"))
            .bind(row.id)
            .bind(row.service_id)
            .bind(row.library_id)
            .bind(row.version)
            .bind(row.action)
            .bind(row.message)
            .bind(row.event_id)
            .bind(row.url)
            .bind(row.timestamp)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// A service's access log, oldest first, optionally for one library.
    pub async fn list_service_logs(&self, service_id: Uuid, library_id: Option<Uuid>) -> Result<Vec<ServiceLog>> {
        let rows: Vec<ServiceLogRow> = match library_id {
            Some(library_id) => {
                sqlx::query_as(include_str!("../../queries/list_service_logs_for_library.sql"))
                    .bind(service_id.to_string())
                    .bind(library_id.to_string())
                    .fetch_all(&self.pool)
                    .await
            },
            None => {
                sqlx::query_as(include_str!("../../queries/list_service_logs.sql"))
                    .bind(service_id.to_string())
                    .fetch_all(&self.pool)
                    .await
            },
        }
        .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(ServiceLog::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::fixtures;
    use cdnget_model::LibraryAction;
    use serde_json::json;

    #[tokio::test]
    async fn test_logs_resolve_parent() {
        let repo = fixtures::repository().await;
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        let version = Arc::new(fixtures::version(&repo, &library, "4.17.21").await);
        let checked = VersionLog::for_version(Arc::clone(&version), LibraryAction::Checked, "no changes");
        repo.append_log(&checked).await.unwrap();

        let logs = repo.list_logs_for_version(Arc::clone(&version)).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, LibraryAction::Added);
        assert_eq!(logs[1].id, checked.id);
        for log in &logs {
            let parent = log.version().unwrap();
            assert_eq!(parent.key(), log.key());
        }
    }

    #[tokio::test]
    async fn test_log_requires_existing_version() {
        let repo = fixtures::repository().await;
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        let orphan = VersionLog::new(library.key().version(Uuid::new_v4()), LibraryAction::Error, "boom");
        let err = repo.append_log(&orphan).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
    }

    #[tokio::test]
    async fn test_logs_are_append_only() {
        let db = crate::Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        fixtures::version(&repo, &library, "1.0").await;
        assert!(sqlx::query("UPDATE version_logs SET message = 'edited'").execute(db.pool()).await.is_err());
        assert!(sqlx::query("DELETE FROM version_logs").execute(db.pool()).await.is_err());
    }

    #[tokio::test]
    async fn test_latest_retrievals() {
        let repo = fixtures::repository().await;
        let (_service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        let first = fixtures::version(&repo, &library, "1.0").await;
        let second = fixtures::version(&repo, &library, "2.0").await;
        let updated = VersionLog::new(first.key(), LibraryAction::Updated, "artifact changed")
            .with_url("https://cdn.example/moved.js")
            .with_provider_data(Some(json!({ "sri": "new" })));
        repo.append_log(&updated).await.unwrap();
        repo.append_log(&VersionLog::new(first.key(), LibraryAction::Error, "later failure")).await.unwrap();

        let latest = repo.latest_retrievals(library.key()).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[&first.id].id, updated.id);
        assert_eq!(latest[&first.id].url.as_deref(), Some("https://cdn.example/moved.js"));
        assert_eq!(latest[&second.id].action, LibraryAction::Added);
    }

    #[tokio::test]
    async fn test_service_logs() {
        let repo = fixtures::repository().await;
        let (service, library) = fixtures::library(&repo, "cdnjs", "lodash").await;
        let listing = ServiceLog::new(service.id, LibraryAction::Error, "listing unavailable");
        let parse = ServiceLog::new(service.id, LibraryAction::Error, "unparsable version")
            .with_library(library.id)
            .with_version("latest");
        repo.append_service_log(&listing).await.unwrap();
        repo.append_service_log(&parse).await.unwrap();

        assert_eq!(repo.list_service_logs(service.id, None).await.unwrap(), [listing, parse.clone()]);
        assert_eq!(repo.list_service_logs(service.id, Some(library.id)).await.unwrap(), [parse]);
    }
}
