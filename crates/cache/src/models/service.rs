use super::{timestamp, uuid};
use crate::error::{Error, ErrorKind};
use cdnget_model::UpstreamService;
use exn::ResultExt;

#[derive(sqlx::FromRow)]
pub(crate) struct ServiceRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) dir_name: String,
    pub(crate) priority: i64,
    pub(crate) description: String,
    pub(crate) created_on: i64,
    pub(crate) modified_on: i64,
}
impl From<&UpstreamService> for ServiceRow {
    fn from(service: &UpstreamService) -> Self {
        Self {
            id: service.id.to_string(),
            name: service.name.clone(),
            dir_name: service.dir_name.clone(),
            priority: i64::from(service.priority),
            description: service.description.clone(),
            created_on: service.created_on.unix_timestamp(),
            modified_on: service.modified_on.unix_timestamp(),
        }
    }
}
impl TryFrom<ServiceRow> for UpstreamService {
    type Error = Error;
    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid("service id", &row.id)?,
            name: row.name,
            dir_name: row.dir_name,
            priority: u16::try_from(row.priority).or_raise(|| ErrorKind::InvalidData("priority"))?,
            description: row.description,
            created_on: timestamp("created on", row.created_on)?,
            modified_on: timestamp("modified on", row.modified_on)?,
        })
    }
}
