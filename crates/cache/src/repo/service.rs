use super::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::ServiceRow;
use cdnget_model::UpstreamService;
use exn::ResultExt;
use tracing::instrument;
use uuid::Uuid;

impl Repository {
    /// Register a new upstream service.
    ///
    /// Returns [`ErrorKind::InvalidService`] if the service fails validation
    /// and [`ErrorKind::AlreadyExists`] if its name or directory name is
    /// already taken (compared case-insensitively).
    #[instrument(skip_all, fields(service = %service.name))]
    pub async fn create_service(&self, service: &UpstreamService) -> Result<()> {
        service.validate().or_raise(|| ErrorKind::InvalidService(service.name.clone()))?;
        if self.dry_run {
            return Ok(());
        }
        let row = ServiceRow::from(service);
        let result = sqlx::query(include_str!("../../queries/insert_service.sql"))
            .bind(row.id)
            .bind(row.name)
            .bind(row.dir_name)
            .bind(row.priority)
            .bind(row.description)
            .bind(row.created_on)
            .bind(row.modified_on)
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if Self::is_unique_violation(&err) => {
                Err(err).or_raise(|| ErrorKind::AlreadyExists(service.name.clone()))
            },
            Err(err) => Err(err).or_raise(|| ErrorKind::Database),
        }
    }

    /// Persist the priority and description of an existing service, the only
    /// fields that change after registration.
    pub async fn update_service(&self, service: &UpstreamService) -> Result<()> {
        service.validate().or_raise(|| ErrorKind::InvalidService(service.name.clone()))?;
        if self.dry_run {
            return Ok(());
        }
        let row = ServiceRow::from(service);
        let result = sqlx::query(include_str!("../../queries/update_service.sql"))
            .bind(row.priority)
            .bind(row.description)
            .bind(row.modified_on)
            .bind(row.id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound(service.name.clone()));
        }
        Ok(())
    }

    pub async fn get_service(&self, id: Uuid) -> Result<Option<UpstreamService>> {
        let row: Option<ServiceRow> = sqlx::query_as(include_str!("../../queries/get_service_by_id.sql"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(UpstreamService::try_from).transpose()
    }

    /// Look up a service by its display name, ignoring case.
    pub async fn get_service_by_name(&self, name: impl AsRef<str>) -> Result<Option<UpstreamService>> {
        let row: Option<ServiceRow> = sqlx::query_as(include_str!("../../queries/get_service_by_name.sql"))
            .bind(name.as_ref().trim())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(UpstreamService::try_from).transpose()
    }

    /// Every registered service, most authoritative first.
    pub async fn list_services(&self) -> Result<Vec<UpstreamService>> {
        let rows: Vec<ServiceRow> = sqlx::query_as(include_str!("../../queries/list_services.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(UpstreamService::try_from).collect()
    }

    /// Delete a service that no library references.
    ///
    /// Returns [`ErrorKind::InUse`] while libraries still reference it. The
    /// service's access log goes with it.
    #[instrument(skip_all, fields(service = %service.name))]
    pub async fn delete_service(&self, service: &UpstreamService) -> Result<()> {
        let (libraries,): (i64,) = sqlx::query_as(include_str!("../../queries/count_service_libraries.sql"))
            .bind(service.id.to_string())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if libraries > 0 {
            exn::bail!(ErrorKind::InUse(service.name.clone()));
        }
        if self.dry_run {
            return Ok(());
        }
        let result = sqlx::query(include_str!("../../queries/delete_service.sql"))
            .bind(service.id.to_string())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            // Either it vanished, or a library was created since the count.
            let kind = match self.get_service(service.id).await? {
                Some(_) => ErrorKind::InUse(service.name.clone()),
                None => ErrorKind::NotFound(service.name.clone()),
            };
            exn::bail!(kind);
        }
        tracing::info!("deleted service");
        Ok(())
    }
}
