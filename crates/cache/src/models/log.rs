use super::{from_json, timestamp, to_json, uuid};
use crate::error::{Error, ErrorKind};
use cdnget_model::{LibraryAction, ServiceLog, VersionKey, VersionLog};
use exn::ResultExt;

#[derive(sqlx::FromRow)]
pub(crate) struct VersionLogRow {
    pub(crate) id: String,
    pub(crate) version_id: String,
    pub(crate) library_id: String,
    pub(crate) service_id: String,
    pub(crate) action: String,
    pub(crate) message: String,
    pub(crate) event_id: Option<i64>,
    pub(crate) url: Option<String>,
    pub(crate) provider_data: Option<String>,
    pub(crate) timestamp: i64,
}
impl TryFrom<&VersionLog> for VersionLogRow {
    type Error = Error;
    fn try_from(log: &VersionLog) -> Result<Self, Self::Error> {
        // Key and cached parent are read together, so they always agree here.
        let key = log.key();
        Ok(Self {
            id: log.id.to_string(),
            version_id: key.version_id.to_string(),
            library_id: key.library_id.to_string(),
            service_id: key.service_id.to_string(),
            action: log.action.as_str().to_string(),
            message: log.message.clone(),
            event_id: log.event_id.map(i64::from),
            url: log.url.clone(),
            provider_data: to_json("provider data", log.provider_data.as_ref())?,
            timestamp: log.timestamp.unix_timestamp(),
        })
    }
}
impl TryFrom<VersionLogRow> for VersionLog {
    type Error = Error;
    fn try_from(row: VersionLogRow) -> Result<Self, Self::Error> {
        let key = VersionKey::new(
            uuid("service id", &row.service_id)?,
            uuid("library id", &row.library_id)?,
            uuid("version id", &row.version_id)?,
        );
        let action = row.action.parse::<LibraryAction>().or_raise(|| ErrorKind::InvalidData("action"))?;
        let mut log = VersionLog::new(key, action, &row.message).with_provider_data(from_json(
            "provider data",
            row.provider_data.as_deref(),
        )?);
        log.id = uuid("log id", &row.id)?;
        log.event_id = row.event_id.map(|id| i32::try_from(id).or_raise(|| ErrorKind::InvalidData("event id"))).transpose()?;
        log.url = row.url;
        log.timestamp = timestamp("timestamp", row.timestamp)?;
        Ok(log)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ServiceLogRow {
    pub(crate) id: String,
    pub(crate) service_id: String,
    pub(crate) library_id: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) action: String,
    pub(crate) message: String,
    pub(crate) event_id: Option<i64>,
    pub(crate) url: Option<String>,
    pub(crate) timestamp: i64,
}
impl From<&ServiceLog> for ServiceLogRow {
    fn from(log: &ServiceLog) -> Self {
        Self {
            id: log.id.to_string(),
            service_id: log.service_id.to_string(),
            library_id: log.library_id.map(|id| id.to_string()),
            version: log.version.clone(),
            action: log.action.as_str().to_string(),
            message: log.message.clone(),
            event_id: log.event_id.map(i64::from),
            url: log.url.clone(),
            timestamp: log.timestamp.unix_timestamp(),
        }
    }
}
impl TryFrom<ServiceLogRow> for ServiceLog {
    type Error = Error;
    fn try_from(row: ServiceLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid("log id", &row.id)?,
            service_id: uuid("service id", &row.service_id)?,
            library_id: row.library_id.as_deref().map(|id| uuid("library id", id)).transpose()?,
            version: row.version,
            action: row.action.parse::<LibraryAction>().or_raise(|| ErrorKind::InvalidData("action"))?,
            message: row.message,
            event_id: row.event_id.map(|id| i32::try_from(id).or_raise(|| ErrorKind::InvalidData("event id"))).transpose()?,
            url: row.url,
            timestamp: timestamp("timestamp", row.timestamp)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_version_log_round_trip() {
        let key = VersionKey::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let log = VersionLog::new(key, LibraryAction::Updated, "artifact changed")
            .with_url("https://cdn.example/a.js")
            .with_event_id(1002);
        let model = VersionLog::try_from(VersionLogRow::try_from(&log).unwrap()).unwrap();
        assert_eq!(model.id, log.id);
        assert_eq!(model.key(), key);
        assert_eq!(model.action, LibraryAction::Updated);
        assert_eq!(model.event_id, Some(1002));
        assert_eq!(model.timestamp, log.timestamp);
        assert!(model.version().is_none());
    }

    #[test]
    fn test_unknown_action_is_invalid() {
        let key = VersionKey::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut row = VersionLogRow::try_from(&VersionLog::new(key, LibraryAction::Added, "")).unwrap();
        row.action = "vanished".to_string();
        let err = VersionLog::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("action")));
    }

    #[test]
    fn test_service_log_round_trip() {
        let log = ServiceLog::new(Uuid::new_v4(), LibraryAction::Error, "listing failed")
            .with_library(Uuid::new_v4())
            .with_version("1.x");
        assert_eq!(ServiceLog::try_from(ServiceLogRow::from(&log)).unwrap(), log);
    }
}
