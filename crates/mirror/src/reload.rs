//! Retrieve already mirrored versions again.

use crate::error::{ErrorKind, Result};
use crate::filter::VersionFilter;
use crate::mirror::{Mirror, content_path_for};
use crate::reconcile::{Outcome, settle};
use crate::report::{LibraryReport, ServiceReport};
use crate::source::{MirrorSource, by_precedence};
use cdnget_model::{Library, LibraryAction, RemoteVersion, VersionLog};
use exn::ResultExt;
use futures::future::join_all;
use futures::stream::FuturesUnordered;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

impl Mirror {
    /// Re-retrieve the content of every known version of `library` matching
    /// `filter`, from where it was last retrieved.
    ///
    /// Retired versions are reinstated. Returns
    /// [`UnknownLibrary`](ErrorKind::UnknownLibrary) if no source mirrors it.
    #[instrument(skip(self, sources, filter))]
    pub async fn reload(&self, library: &str, sources: &[MirrorSource], filter: &VersionFilter) -> Result<LibraryReport> {
        let name = library.trim();
        self.ensure_running()?;
        let ordered = by_precedence(sources);
        let mut services = Vec::with_capacity(ordered.len());
        for result in join_all(ordered.iter().map(|source| self.reload_service(source, name, filter))).await {
            services.push(result?);
        }
        if services.iter().all(|report| report.library_id.is_none()) {
            exn::bail!(ErrorKind::UnknownLibrary(name.to_string()));
        }
        Ok(LibraryReport {
            library: name.to_string(),
            services,
            ..LibraryReport::default()
        })
    }

    async fn reload_service(&self, source: &MirrorSource, name: &str, filter: &VersionFilter) -> Result<ServiceReport> {
        let mut report = ServiceReport::new(&source.service);
        let Some(library) = self.repo.get_library(source.service.id, name).await.or_raise(|| ErrorKind::Cache)? else {
            return Ok(report);
        };
        report.library_id = Some(library.id);
        let mut latest = self.repo.latest_retrievals(library.key()).await.or_raise(|| ErrorKind::Cache)?;
        let (selected, skipped): (Vec<_>, Vec<_>) = self
            .repo
            .list_known_versions(library.key())
            .await
            .or_raise(|| ErrorKind::Cache)?
            .into_iter()
            .partition(|version| filter.matches(&version.value));
        report.filtered = skipped.len();
        report.staged = selected.len();
        let running: FuturesUnordered<_> = selected
            .into_iter()
            .map(|version| {
                let last = latest.remove(&version.id);
                self.reload_version(source, &library, Arc::new(version), last)
            })
            .collect();
        settle(running, report).await
    }

    async fn reload_version(
        &self,
        source: &MirrorSource,
        library: &Library,
        version: Arc<RemoteVersion>,
        last: Option<VersionLog>,
    ) -> Result<Outcome> {
        let (locator, provider_data) = match last {
            Some(log) => (log.url.unwrap_or_else(|| version.locator.clone()), log.provider_data),
            None => (version.locator.clone(), version.provider_data.clone()),
        };
        let path = match &version.content_path {
            Some(path) => Ok(path.clone()),
            None => content_path_for(&source.service, library, &version.value, &locator),
        };
        let stored = match path {
            Ok(path) => self.transfer(&source.upstream, &locator, Path::new(&path)).await,
            Err(err) => Err(err),
        };
        match stored {
            Ok(_) => {},
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => return self.failed(&version, &locator, &err).await,
        }

        let message = if version.is_retired() { "reinstated" } else { "reloaded" };
        let log = VersionLog::for_version(Arc::clone(&version), LibraryAction::Reload, format!("{message} {}", version.raw))
            .with_url(&locator)
            .with_provider_data(provider_data);
        self.repo.record_reload(&version, &log).await.or_raise(|| ErrorKind::Cache)?;
        tracing::info!(version = %version.raw, %locator, "{message} version");
        Ok(Outcome::Reloaded(version.raw.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::fixtures::harness;
    use cdnget_upstream::{MockFailure, MockUpstream};

    #[tokio::test]
    async fn test_reload_rewrites_content() {
        let h = harness().await;
        let mock = Arc::new(MockUpstream::default());
        mock.publish("lodash", "4.17.21", "lodash/4.17.21/lodash.min.js", *b"v1");
        let cdnjs = h.source("cdnjs", 1, &mock).await;
        let sources = [cdnjs];
        h.mirror.reconcile_library("lodash", &sources, &VersionFilter::all()).await.unwrap();
        mock.publish("lodash", "4.17.21", "lodash/4.17.21/lodash.min.js", *b"v2");

        let report = h.mirror.reload("lodash", &sources, &VersionFilter::all()).await.unwrap();
        assert_eq!(report.service("cdnjs").unwrap().reloaded, ["4.17.21"]);
        assert_eq!(h.stored("cdnjs/lodash/4.17.21/lodash.min.js").await.as_deref(), Some(&b"v2"[..]));
        let library = h.store.get_library(sources[0].service.id, "lodash").await.unwrap().unwrap();
        let actions: Vec<_> =
            h.store.list_logs_for_library(library.key()).await.unwrap().into_iter().map(|log| log.action).collect();
        assert_eq!(actions, [LibraryAction::Added, LibraryAction::Reload]);
    }

    #[tokio::test]
    async fn test_reload_reinstates_removed_version() {
        let h = harness().await;
        let mock = Arc::new(MockUpstream::default());
        mock.publish("lodash", "4.17.21", "lodash/4.17.21/lodash.min.js", *b"v1");
        let cdnjs = h.source("cdnjs", 1, &mock).await;
        let sources = [cdnjs];
        h.mirror.reconcile_library("lodash", &sources, &VersionFilter::all()).await.unwrap();
        h.mirror.remove("lodash", &[], &VersionFilter::all()).await.unwrap();
        assert!(h.stored("cdnjs/lodash/4.17.21/lodash.min.js").await.is_none());

        h.mirror.reload("lodash", &sources, &VersionFilter::all()).await.unwrap();
        let library = h.store.get_library(sources[0].service.id, "lodash").await.unwrap().unwrap();
        let versions = h.store.list_versions(library.key()).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert!(!versions[0].is_retired());
        assert!(h.stored("cdnjs/lodash/4.17.21/lodash.min.js").await.is_some());
    }

    #[tokio::test]
    async fn test_reload_failure_is_logged_on_the_version() {
        let h = harness().await;
        let mock = Arc::new(MockUpstream::default());
        mock.publish("lodash", "4.17.21", "lodash/4.17.21/lodash.min.js", *b"v1");
        let cdnjs = h.source("cdnjs", 1, &mock).await;
        let sources = [cdnjs];
        h.mirror.reconcile_library("lodash", &sources, &VersionFilter::all()).await.unwrap();
        mock.fail_retrieval("lodash/4.17.21/lodash.min.js", MockFailure::AccessDenied, 1);

        let report = h.mirror.reload("lodash", &sources, &VersionFilter::all()).await.unwrap();
        let service = report.service("cdnjs").unwrap();
        assert!(service.reloaded.is_empty());
        assert_eq!(service.failed.len(), 1);
        let library = h.store.get_library(sources[0].service.id, "lodash").await.unwrap().unwrap();
        let logs = h.store.list_logs_for_library(library.key()).await.unwrap();
        assert_eq!(logs.last().unwrap().action, LibraryAction::Error);
        assert_eq!(logs.last().unwrap().url.as_deref(), Some("lodash/4.17.21/lodash.min.js"));
    }

    #[tokio::test]
    async fn test_reload_respects_filter() {
        let h = harness().await;
        let mock = Arc::new(MockUpstream::default());
        mock.publish("lodash", "1.0.0", "lodash/1.0.0/lodash.js", *b"1");
        mock.publish("lodash", "2.0.0", "lodash/2.0.0/lodash.js", *b"2");
        let cdnjs = h.source("cdnjs", 1, &mock).await;
        let sources = [cdnjs];
        h.mirror.reconcile_library("lodash", &sources, &VersionFilter::all()).await.unwrap();

        let filter = VersionFilter::only(["2.0.0"]).unwrap();
        let report = h.mirror.reload("lodash", &sources, &filter).await.unwrap();
        let service = report.service("cdnjs").unwrap();
        assert_eq!(service.reloaded, ["2.0.0"]);
        assert_eq!(service.filtered, 1);
        assert_eq!(mock.retrievals("lodash/1.0.0/lodash.js"), 1);
        assert_eq!(mock.retrievals("lodash/2.0.0/lodash.js"), 2);
    }

    #[tokio::test]
    async fn test_reload_unknown_library() {
        let h = harness().await;
        let mock = Arc::new(MockUpstream::default());
        let cdnjs = h.source("cdnjs", 1, &mock).await;
        let err = h.mirror.reload("lodash", &[cdnjs], &VersionFilter::all()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownLibrary(name) if name == "lodash"));
    }
}
