use super::{from_json, timestamp, to_json, uuid};
use crate::error::{Error, ErrorKind};
use cdnget_model::{RemoteVersion, VersionValue};
use exn::ResultExt;

#[derive(sqlx::FromRow)]
pub(crate) struct VersionRow {
    pub(crate) id: String,
    pub(crate) service_id: String,
    pub(crate) library_id: String,
    pub(crate) version_key: String,
    pub(crate) raw: String,
    pub(crate) locator: String,
    pub(crate) provider_data: Option<String>,
    pub(crate) content_path: Option<String>,
    pub(crate) retrieved_on: i64,
    pub(crate) retired_on: Option<i64>,
}
impl TryFrom<&RemoteVersion> for VersionRow {
    type Error = Error;
    fn try_from(version: &RemoteVersion) -> Result<Self, Self::Error> {
        Ok(Self {
            id: version.id.to_string(),
            service_id: version.service_id.to_string(),
            library_id: version.library_id.to_string(),
            version_key: version.value.key(),
            raw: version.raw.clone(),
            locator: version.locator.clone(),
            provider_data: to_json("provider data", version.provider_data.as_ref())?,
            content_path: version.content_path.clone(),
            retrieved_on: version.retrieved_on.unix_timestamp(),
            retired_on: version.retired_on.map(|retired| retired.unix_timestamp()),
        })
    }
}
impl TryFrom<VersionRow> for RemoteVersion {
    type Error = Error;
    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        let value = VersionValue::parse(&row.raw).or_raise(|| ErrorKind::InvalidData("version"))?;
        if value.key() != row.version_key {
            exn::bail!(ErrorKind::InvalidData("version key"));
        }
        Ok(Self {
            id: uuid("version id", &row.id)?,
            service_id: uuid("service id", &row.service_id)?,
            library_id: uuid("library id", &row.library_id)?,
            value,
            raw: row.raw,
            locator: row.locator,
            provider_data: from_json("provider data", row.provider_data.as_deref())?,
            content_path: row.content_path,
            retrieved_on: timestamp("retrieved on", row.retrieved_on)?,
            retired_on: row.retired_on.map(|retired| timestamp("retired on", retired)).transpose()?,
        })
    }
}
