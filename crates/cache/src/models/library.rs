use super::{timestamp, uuid};
use crate::error::Error;
use cdnget_model::Library;

#[derive(sqlx::FromRow)]
pub(crate) struct LibraryRow {
    pub(crate) id: String,
    pub(crate) service_id: String,
    pub(crate) name: String,
    pub(crate) created_on: i64,
    pub(crate) modified_on: i64,
}
impl From<&Library> for LibraryRow {
    fn from(library: &Library) -> Self {
        Self {
            id: library.id.to_string(),
            service_id: library.service_id.to_string(),
            name: library.name.clone(),
            created_on: library.created_on.unix_timestamp(),
            modified_on: library.modified_on.unix_timestamp(),
        }
    }
}
impl TryFrom<LibraryRow> for Library {
    type Error = Error;
    fn try_from(row: LibraryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid("library id", &row.id)?,
            service_id: uuid("service id", &row.service_id)?,
            name: row.name,
            created_on: timestamp("created on", row.created_on)?,
            modified_on: timestamp("modified on", row.modified_on)?,
        })
    }
}
