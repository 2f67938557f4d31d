//! Explicit, operator-issued removal.
//!
//! A version missing from a listing is never removed. Removal retires the
//! version row, logs it and deletes the mirrored bytes; later reconciliation
//! passes leave retired versions alone until they are reloaded.

use crate::error::{ErrorKind, Result};
use crate::filter::VersionFilter;
use crate::mirror::Mirror;
use crate::report::{Failure, RemovalReport, Removed};
use cdnget_model::{LibraryAction, UpstreamService, VersionLog};
use cdnget_storage::error::ErrorKind as StorageErrorKind;
use exn::ResultExt;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

const REMOVED_MESSAGE: &str = "removed on request";

impl Mirror {
    /// Remove the versions of `library` that match `filter` from `services`,
    /// or from every registered service when `services` is empty.
    ///
    /// Returns [`UnknownLibrary`](ErrorKind::UnknownLibrary) if none of them
    /// mirrors the library.
    #[instrument(skip(self, services, filter))]
    pub async fn remove(
        &self,
        library: &str,
        services: &[UpstreamService],
        filter: &VersionFilter,
    ) -> Result<RemovalReport> {
        let name = library.trim();
        let services = match services {
            [] => self.repo.list_services().await.or_raise(|| ErrorKind::Cache)?,
            services => services.to_vec(),
        };
        let mut report = RemovalReport {
            library: name.to_string(),
            ..RemovalReport::default()
        };
        let mut found = false;
        for service in &services {
            let Some(library) = self.repo.get_library(service.id, name).await.or_raise(|| ErrorKind::Cache)? else {
                continue;
            };
            found = true;
            let versions = self.repo.list_known_versions(library.key()).await.or_raise(|| ErrorKind::Cache)?;
            for version in versions.into_iter().filter(|version| filter.matches(&version.value)) {
                let version = Arc::new(version);
                let log = VersionLog::for_version(Arc::clone(&version), LibraryAction::Removed, REMOVED_MESSAGE);
                if version.is_retired() || !self.repo.retire_version(&version, &log).await.or_raise(|| ErrorKind::Cache)? {
                    report.already_retired += 1;
                    continue;
                }
                tracing::info!(service = %service.name, version = %version.raw, "removed version");
                report.removed.push(Removed {
                    service: service.name.clone(),
                    version: version.raw.clone(),
                });
                let Some(path) = &version.content_path else {
                    continue;
                };
                match self.content.delete(Path::new(path)).await {
                    Ok(()) => {},
                    Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => {},
                    Err(err) => {
                        let message = (*err).to_string();
                        tracing::warn!(%path, error = %message, "could not delete removed content");
                        report.content_errors.push(Failure::new(version.raw.clone(), message));
                    },
                }
            }
        }
        if !found {
            exn::bail!(ErrorKind::UnknownLibrary(name.to_string()));
        }
        Ok(report)
    }
}
