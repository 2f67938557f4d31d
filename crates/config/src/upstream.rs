use crate::error::{ErrorKind, Result};
use cdnget_model::{DEFAULT_PRIORITY, UpstreamService};
use cdnget_storage::backend::LocalBackend;
use cdnget_upstream::{ManifestLibrary, ManifestListing, Upstream};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

fn default_priority() -> u16 {
    DEFAULT_PRIORITY
}

/// One upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Directory under the content root; defaults to the service name.
    #[serde(default)]
    pub dir_name: Option<String>,
    /// Lower is more authoritative.
    #[serde(default = "default_priority")]
    pub priority: u16,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: UpstreamKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpstreamKind {
    /// A static listing per library; locators are paths under `origin`.
    Manifest {
        origin: PathBuf,
        #[serde(default)]
        libraries: BTreeMap<String, ManifestLibrary>,
    },
}

impl UpstreamConfig {
    /// The service this upstream registers as.
    pub fn service(&self, name: &str) -> Result<UpstreamService> {
        let dir_name = self.dir_name.as_deref().unwrap_or(name);
        let service = UpstreamService::new(name, dir_name).or_raise(|| ErrorKind::Invalid(format!("upstream `{name}`")))?;
        Ok(service.with_priority(self.priority).with_description(&self.description))
    }

    /// Build the listing and retrieval capability for this upstream.
    pub fn upstream(&self) -> Result<Upstream> {
        match &self.kind {
            UpstreamKind::Manifest { origin, libraries } => {
                let origin = std::path::absolute(origin)
                    .or_raise(|| ErrorKind::Invalid(format!("origin `{}`", origin.display())))?;
                let backend = LocalBackend::new("origin", &origin)
                    .or_raise(|| ErrorKind::Invalid(format!("origin `{}`", origin.display())))?;
                let listing = ManifestListing::new(libraries.clone());
                Ok(Upstream::manifest(listing, Arc::new(backend)))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir_name: Option<&str>) -> UpstreamConfig {
        UpstreamConfig {
            dir_name: dir_name.map(str::to_string),
            priority: 3,
            description: " secondary ".to_string(),
            kind: UpstreamKind::Manifest {
                origin: PathBuf::from("/srv/origin"),
                libraries: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn test_service_defaults_dir_name() {
        let service = config(None).service(" cdnjs ").unwrap();
        assert_eq!(service.name, "cdnjs");
        assert_eq!(service.dir_name, "cdnjs");
        assert_eq!(service.priority, 3);
        assert_eq!(service.description, "secondary");
    }

    #[test]
    fn test_service_rejects_bad_dir_name() {
        let err = config(Some("a/b")).service("cdnjs").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_build_manifest_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(None);
        config.kind = UpstreamKind::Manifest {
            origin: dir.path().join("origin"),
            libraries: BTreeMap::new(),
        };
        config.upstream().unwrap();
        assert!(dir.path().join("origin").is_dir());
    }
}
