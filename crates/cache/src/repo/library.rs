use super::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::LibraryRow;
use cdnget_model::Library;
use exn::ResultExt;
use tracing::instrument;
use uuid::Uuid;

impl Repository {
    /// Fetch the library `name` of a service, creating it on first sight.
    ///
    /// Library names are unique per service, ignoring case. A concurrent
    /// creation of the same library resolves to the stored row. In a dry run
    /// an unknown library is returned without being stored.
    #[instrument(skip(self))]
    pub async fn get_or_create_library(&self, service_id: Uuid, name: &str) -> Result<Library> {
        if let Some(existing) = self.get_library(service_id, name).await? {
            return Ok(existing);
        }
        let library = Library::new(service_id, name).or_raise(|| ErrorKind::InvalidData("library name"))?;
        if self.dry_run {
            return Ok(library);
        }
        let row = LibraryRow::from(&library);
        let result = sqlx::query(include_str!("../../queries/insert_library.sql"))
            .bind(row.id)
            .bind(row.service_id)
            .bind(row.name)
            .bind(row.created_on)
            .bind(row.modified_on)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() > 0 {
            tracing::debug!(library_id = %library.id, "created library");
            return Ok(library);
        }
        self.get_library(service_id, name).await?.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(name.to_string())))
    }

    /// Look up a library by name within one service, ignoring case.
    pub async fn get_library(&self, service_id: Uuid, name: &str) -> Result<Option<Library>> {
        let row: Option<LibraryRow> = sqlx::query_as(include_str!("../../queries/get_library.sql"))
            .bind(service_id.to_string())
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Library::try_from).transpose()
    }

    pub async fn get_library_by_id(&self, id: Uuid) -> Result<Option<Library>> {
        let row: Option<LibraryRow> = sqlx::query_as(include_str!("../../queries/get_library_by_id.sql"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Library::try_from).transpose()
    }

    /// Libraries ordered by name, for one service or across all of them.
    pub async fn list_libraries(&self, service_id: Option<Uuid>) -> Result<Vec<Library>> {
        let rows: Vec<LibraryRow> = match service_id {
            Some(service_id) => sqlx::query_as(include_str!("../../queries/list_libraries_for_service.sql"))
                .bind(service_id.to_string())
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query_as(include_str!("../../queries/list_libraries.sql")).fetch_all(&self.pool).await,
        }
        .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Library::try_from).collect()
    }
}
