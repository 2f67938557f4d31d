mod library;
mod log;
mod service;
mod version;

pub(crate) use self::library::LibraryRow;
pub(crate) use self::log::{ServiceLogRow, VersionLogRow};
pub(crate) use self::service::ServiceRow;
pub(crate) use self::version::VersionRow;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde_json::Value;
use time::UtcDateTime;
use uuid::Uuid;

pub(crate) fn uuid(field: &'static str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn timestamp(field: &'static str, value: i64) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp(value).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn from_json(field: &'static str, value: Option<&str>) -> Result<Option<Value>> {
    value.map(|json| serde_json::from_str(json).or_raise(|| ErrorKind::InvalidData(field))).transpose()
}

pub(crate) fn to_json(field: &'static str, value: Option<&Value>) -> Result<Option<String>> {
    value.map(|json| serde_json::to_string(json).or_raise(|| ErrorKind::InvalidData(field))).transpose()
}
