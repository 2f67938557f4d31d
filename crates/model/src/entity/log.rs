use super::{LibraryAction, RemoteVersion, non_blank, now};
use crate::error::{ErrorKind, Result};
use crate::identity::{Navigation, VersionKey};
use serde_json::Value;
use std::sync::Arc;
use time::UtcDateTime;
use uuid::Uuid;

/// Append-only audit record for one version.
///
/// The `(service, library, version)` key and the optionally cached parent
/// [`RemoteVersion`] live together in one [`Navigation`] slot, so they can
/// only ever be replaced as a pair.
#[derive(Debug, Clone)]
pub struct VersionLog {
    pub id: Uuid,
    pub action: LibraryAction,
    pub message: String,
    pub event_id: Option<i32>,
    pub url: Option<String>,
    pub provider_data: Option<Value>,
    pub timestamp: UtcDateTime,
    parent: Navigation<RemoteVersion>,
}
impl VersionLog {
    /// A log entry for a version known only by its key.
    pub fn new(key: VersionKey, action: LibraryAction, message: impl AsRef<str>) -> Self {
        Self::with_parent(Navigation::new(key), action, message)
    }

    /// A log entry with its parent already resolved.
    pub fn for_version(version: Arc<RemoteVersion>, action: LibraryAction, message: impl AsRef<str>) -> Self {
        Self::with_parent(Navigation::resolved(version), action, message)
    }

    fn with_parent(parent: Navigation<RemoteVersion>, action: LibraryAction, message: impl AsRef<str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            message: message.as_ref().trim().to_string(),
            event_id: None,
            url: None,
            provider_data: None,
            timestamp: now(),
            parent,
        }
    }

    pub fn with_url(mut self, url: impl AsRef<str>) -> Self {
        self.url = non_blank(url);
        self
    }

    pub fn with_event_id(mut self, event_id: i32) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn with_provider_data(mut self, provider_data: Option<Value>) -> Self {
        self.provider_data = provider_data;
        self
    }

    pub fn key(&self) -> VersionKey {
        self.parent.key()
    }

    pub fn service_id(&self) -> Uuid {
        self.key().service_id
    }

    pub fn library_id(&self) -> Uuid {
        self.key().library_id
    }

    pub fn version_id(&self) -> Uuid {
        self.key().version_id
    }

    /// The cached parent, if resolved. Its key always equals [`key`](Self::key).
    pub fn version(&self) -> Option<Arc<RemoteVersion>> {
        self.parent.target()
    }

    /// Point at another version; all three key parts are taken from it.
    pub fn set_version(&self, version: Arc<RemoteVersion>) {
        self.parent.set_target(version);
    }

    /// Replace the whole key at once, dropping a cached parent that no longer matches.
    pub fn replace_identity(&self, key: VersionKey) {
        if let Some(stale) = self.parent.replace_identity(key) {
            tracing::debug!(log = %self.id, stale = %stale.id, "dropped cached version after identity change");
        }
    }

    /// Set one key part. Fails with [`IdentityMismatch`](ErrorKind::IdentityMismatch)
    /// and changes nothing if a cached parent disagrees with the result.
    pub fn set_version_id(&self, version_id: Uuid) -> Result<()> {
        self.set_part("version_id", version_id, |key| &mut key.version_id)
    }

    pub fn set_library_id(&self, library_id: Uuid) -> Result<()> {
        self.set_part("library_id", library_id, |key| &mut key.library_id)
    }

    pub fn set_service_id(&self, service_id: Uuid) -> Result<()> {
        self.set_part("service_id", service_id, |key| &mut key.service_id)
    }

    fn set_part(&self, field: &'static str, value: Uuid, part: fn(&mut VersionKey) -> &mut Uuid) -> Result<()> {
        self.parent
            .try_update(|mut key| {
                *part(&mut key) = value;
                key
            })
            .map_err(|mut cached| {
                exn::Exn::from(ErrorKind::IdentityMismatch {
                    field,
                    cached: *part(&mut cached),
                    attempted: value,
                })
            })
    }
}

/// Append-only, service-scoped access log.
///
/// Records what happened while mirroring a service when there is no version
/// row to hang a [`VersionLog`] on: listing failures, unparsable versions,
/// failed first retrievals, name mismatches and "checked, no changes".
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceLog {
    pub id: Uuid,
    pub service_id: Uuid,
    pub library_id: Option<Uuid>,
    /// Raw version string the entry concerns, if any.
    pub version: Option<String>,
    pub action: LibraryAction,
    pub message: String,
    pub event_id: Option<i32>,
    pub url: Option<String>,
    pub timestamp: UtcDateTime,
}
impl ServiceLog {
    pub fn new(service_id: Uuid, action: LibraryAction, message: impl AsRef<str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_id,
            library_id: None,
            version: None,
            action,
            message: message.as_ref().trim().to_string(),
            event_id: None,
            url: None,
            timestamp: now(),
        }
    }

    pub fn with_library(mut self, library_id: Uuid) -> Self {
        self.library_id = Some(library_id);
        self
    }

    pub fn with_version(mut self, raw: impl AsRef<str>) -> Self {
        self.version = non_blank(raw);
        self
    }

    pub fn with_url(mut self, url: impl AsRef<str>) -> Self {
        self.url = non_blank(url);
        self
    }

    pub fn with_event_id(mut self, event_id: i32) -> Self {
        self.event_id = Some(event_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::LibraryKey;
    use rstest::rstest;

    fn version() -> Arc<RemoteVersion> {
        let library = LibraryKey::new(Uuid::new_v4(), Uuid::new_v4());
        Arc::new(RemoteVersion::new(library, "4.17.21", "lodash.min.js").unwrap())
    }

    #[test]
    fn test_for_version_copies_identity() {
        let version = version();
        let log = VersionLog::for_version(version.clone(), LibraryAction::Added, "  added  ")
            .with_url("https://cdnjs.cloudflare.com/ajax/libs/lodash.js/4.17.21/lodash.min.js");
        assert_eq!(log.key(), version.key());
        assert_eq!(log.message, "added");
        assert!(log.url.is_some());
        assert!(log.version().is_some_and(|v| v.id == version.id));
    }

    #[rstest]
    #[case("version_id")]
    #[case("library_id")]
    #[case("service_id")]
    fn test_mismatching_part_is_rejected(#[case] field: &str) {
        let version = version();
        let log = VersionLog::for_version(version.clone(), LibraryAction::Added, "");
        let attempted = Uuid::new_v4();
        let result = match field {
            "version_id" => log.set_version_id(attempted),
            "library_id" => log.set_library_id(attempted),
            _ => log.set_service_id(attempted),
        };
        let err = result.unwrap_err();
        assert!(matches!(
            &*err,
            ErrorKind::IdentityMismatch { field: f, attempted: a, .. } if *f == field && *a == attempted
        ));
        // Key and reference still agree.
        assert_eq!(log.key(), version.key());
        assert!(log.version().is_some_and(|v| v.key() == log.key()));
    }

    #[test]
    fn test_matching_part_is_accepted() {
        let version = version();
        let log = VersionLog::for_version(version.clone(), LibraryAction::Added, "");
        log.set_version_id(version.id).unwrap();
        assert!(log.version().is_some());
    }

    #[test]
    fn test_unresolved_parts_can_be_set() {
        let version = version();
        let log = VersionLog::new(version.key(), LibraryAction::Error, "timeout");
        let version_id = Uuid::new_v4();
        log.set_version_id(version_id).unwrap();
        assert_eq!(log.version_id(), version_id);
        assert_eq!(log.library_id(), version.library_id);
    }

    #[test]
    fn test_replace_identity_clears_stale_reference() {
        let log = VersionLog::for_version(version(), LibraryAction::Added, "");
        let other = version();
        log.replace_identity(other.key());
        assert_eq!(log.key(), other.key());
        assert!(log.version().is_none());
    }

    #[test]
    fn test_set_version_overwrites_key() {
        let log = VersionLog::for_version(version(), LibraryAction::Added, "");
        let other = version();
        log.set_version(other.clone());
        assert_eq!(log.key(), other.key());
        assert_eq!(log.service_id(), other.service_id);
    }

    #[test]
    fn test_service_log_builder() {
        let entry = ServiceLog::new(Uuid::new_v4(), LibraryAction::Error, "not found")
            .with_version(" 1.0-bad ")
            .with_url("");
        assert_eq!(entry.version.as_deref(), Some("1.0-bad"));
        assert!(entry.url.is_none());
        assert!(entry.library_id.is_none());
    }
}
