use super::{non_blank, now};
use crate::error::{ErrorKind, Result};
use crate::identity::{Identified, LibraryKey, VersionKey};
use crate::version::VersionValue;
use serde_json::Value;
use time::UtcDateTime;
use uuid::Uuid;

/// One published release of a library, as mirrored from one service.
///
/// Immutable once recorded, apart from the retirement marker set by an
/// explicit removal. A changed artifact at the same version is recorded as
/// an `updated` log entry, never by rewriting this row.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteVersion {
    pub id: Uuid,
    pub service_id: Uuid,
    pub library_id: Uuid,
    pub value: VersionValue,
    /// The version string exactly as upstream reported it (trimmed).
    pub raw: String,
    pub locator: String,
    pub provider_data: Option<Value>,
    /// Location of the retrieved bytes, relative to the content root.
    pub content_path: Option<String>,
    pub retrieved_on: UtcDateTime,
    pub retired_on: Option<UtcDateTime>,
}
impl RemoteVersion {
    pub fn new(library: LibraryKey, raw: impl AsRef<str>, locator: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref().trim();
        let value = VersionValue::parse(raw)?;
        let Some(locator) = non_blank(locator) else {
            exn::bail!(ErrorKind::MissingField("locator"));
        };
        Ok(Self {
            id: Uuid::new_v4(),
            service_id: library.service_id,
            library_id: library.library_id,
            value,
            raw: raw.to_string(),
            locator,
            provider_data: None,
            content_path: None,
            retrieved_on: now(),
            retired_on: None,
        })
    }

    pub fn with_provider_data(mut self, provider_data: Option<Value>) -> Self {
        self.provider_data = provider_data;
        self
    }

    pub fn with_content_path(mut self, content_path: impl Into<String>) -> Self {
        self.content_path = Some(content_path.into());
        self
    }

    pub fn key(&self) -> VersionKey {
        VersionKey::new(self.service_id, self.library_id, self.id)
    }

    pub fn library_key(&self) -> LibraryKey {
        LibraryKey::new(self.service_id, self.library_id)
    }

    pub fn is_retired(&self) -> bool {
        self.retired_on.is_some()
    }
}
impl Identified for RemoteVersion {
    type Key = VersionKey;
    fn key(&self) -> VersionKey {
        RemoteVersion::key(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_version() {
        let library = LibraryKey::new(Uuid::new_v4(), Uuid::new_v4());
        let version = RemoteVersion::new(library, " 4.17.21 ", "lodash/4.17.21/lodash.min.js").unwrap();
        assert_eq!(version.raw, "4.17.21");
        assert_eq!(version.value.to_string(), "4.17.21");
        assert_eq!(version.library_key(), library);
        assert_eq!(version.key().version_id, version.id);
        assert!(!version.is_retired());
    }

    #[test]
    fn test_rejects_unparsable_version() {
        let library = LibraryKey::new(Uuid::new_v4(), Uuid::new_v4());
        let err = RemoteVersion::new(library, "latest", "x.js").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidVersion(_)));
    }

    #[test]
    fn test_requires_locator() {
        let library = LibraryKey::new(Uuid::new_v4(), Uuid::new_v4());
        let err = RemoteVersion::new(library, "1.0", "  ").unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingField("locator")));
    }
}
