//! Reconciliation: bring every service's mirror of a library in step with
//! what that service currently lists.
//!
//! Services are mirrored independently. Their listings are read concurrently,
//! each is compared with the same service's rows only, and the resulting
//! retrievals share one bounded pool of permits. Failures of a single version
//! are logged and reported; they never stop sibling versions, services or
//! libraries.

use crate::error::{Error, ErrorKind, Result};
use crate::filter::VersionFilter;
use crate::mirror::{Mirror, content_path_for};
use crate::plan::{Decision, plan};
use crate::report::{Failure, LibraryReport, ServiceReport};
use crate::source::{MirrorSource, by_precedence};
use async_stream::stream;
use cdnget_cache::InsertOutcome;
use cdnget_model::{Library, LibraryAction, LibraryMetadata, RemoteVersion, ServiceLog, VersionLog, VersionValue};
use cdnget_upstream::ListingEntry;
use cdnget_upstream::error::ErrorKind as UpstreamErrorKind;
use exn::ResultExt;
use futures::future::join_all;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Progress events emitted by [`Mirror::reconcile`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`Reconciled`](Self::Reconciled), once per library, in completion order.
/// 3. [`Complete`](Self::Complete), exactly once.
///
/// A library that fails outright is reported as an `Err` item and the stream
/// carries on. Cancellation ends the stream after its `Err` item, without
/// [`Complete`](Self::Complete).
#[derive(Debug)]
pub enum MirrorEvent {
    Started,
    Reconciled(Box<LibraryReport>),
    Complete,
}

/// What one service's listing said about a library.
#[derive(Default)]
struct Observation {
    metadata: Option<LibraryMetadata>,
    entries: Vec<ListingEntry>,
    /// Set when the listing ended early; entries before it remain valid.
    error: Option<String>,
    /// Set when metadata failed for a reason other than an unknown library.
    metadata_error: Option<String>,
}
impl Observation {
    /// The service does not carry the library at all.
    fn is_absent(&self) -> bool {
        self.metadata.is_none() && self.entries.is_empty()
    }
}

/// How one staged decision turned out.
pub(crate) enum Outcome {
    Added(String),
    Updated(String),
    Reloaded(String),
    AlreadyPresent(String),
    Failed(Failure),
}
impl Outcome {
    pub(crate) fn record(self, report: &mut ServiceReport) {
        match self {
            Self::Added(raw) => report.added.push(raw),
            Self::Updated(raw) => report.updated.push(raw),
            Self::Reloaded(raw) => report.reloaded.push(raw),
            Self::AlreadyPresent(raw) => report.already_present.push(raw),
            Self::Failed(failure) => report.failed.push(failure),
        }
    }
}

impl Mirror {
    /// Stream [`MirrorEvent`]s while reconciling every library in `libraries`.
    ///
    /// Libraries are reconciled concurrently, at most `concurrency` at a time;
    /// more are started as others finish.
    pub fn reconcile<'a>(
        &'a self,
        libraries: &'a [String],
        sources: &'a [MirrorSource],
        filter: &'a VersionFilter,
    ) -> impl Stream<Item = Result<MirrorEvent>> + 'a {
        stream!({
            yield Ok(MirrorEvent::Started);

            let mut pending: Vec<_> =
                libraries.iter().map(|library| self.reconcile_library(library, sources, filter)).collect();
            let mut processing = FuturesUnordered::new();
            processing.extend(pending.drain(..self.concurrency.min(pending.len())));
            while let Some(result) = processing.next().await {
                match result {
                    Ok(report) => yield Ok(MirrorEvent::Reconciled(Box::new(report))),
                    Err(err) if err.is_cancelled() => {
                        yield Err(err);
                        return;
                    },
                    Err(err) => yield Err(err),
                }
                // Pop-n-push, FIFO.
                if !pending.is_empty() {
                    processing.push(pending.remove(0));
                }
            }

            yield Ok(MirrorEvent::Complete);
        })
    }

    /// Reconcile one library against every source.
    ///
    /// Display metadata is merged field by field, most authoritative service
    /// first; version rows are never shared between services.
    #[instrument(skip(self, sources, filter))]
    pub async fn reconcile_library(
        &self,
        library: &str,
        sources: &[MirrorSource],
        filter: &VersionFilter,
    ) -> Result<LibraryReport> {
        let name = library.trim();
        if name.is_empty() {
            exn::bail!(ErrorKind::UnknownLibrary(library.to_string()));
        }
        self.ensure_running()?;
        let ordered = by_precedence(sources);
        let observations = join_all(ordered.iter().map(|source| observe(source, name))).await;
        self.ensure_running()?;

        let mut metadata = LibraryMetadata::default();
        for observed in observations.iter().filter_map(|observation| observation.metadata.as_ref()) {
            metadata.fill_from(observed);
        }

        let passes = ordered
            .iter()
            .zip(observations)
            .map(|(source, observation)| self.reconcile_service(source, name, observation, filter));
        let mut services = Vec::with_capacity(ordered.len());
        let mut failure: Option<Error> = None;
        for result in join_all(passes).await {
            match result {
                Ok(report) => services.push(report),
                // Cancellation wins over any other failure.
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    failure.get_or_insert(err);
                },
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }
        let report = LibraryReport {
            library: name.to_string(),
            metadata,
            services,
        };
        tracing::info!(library = %report.library, staged = report.staged(), "reconciled library");
        Ok(report)
    }

    #[instrument(skip_all, fields(service = %source.service.name, library = %name))]
    async fn reconcile_service(
        &self,
        source: &MirrorSource,
        name: &str,
        observation: Observation,
        filter: &VersionFilter,
    ) -> Result<ServiceReport> {
        let service = &source.service;
        let mut report = ServiceReport::new(service);
        report.listing_error.clone_from(&observation.error);
        report.metadata_error.clone_from(&observation.metadata_error);

        if observation.is_absent() {
            let mut messages = Vec::new();
            if let Some(error) = &observation.metadata_error {
                messages.push(format!("metadata for `{name}` unavailable: {error}"));
            }
            if let Some(error) = &observation.error {
                messages.push(format!("listing `{name}` failed: {error}"));
            }
            if !messages.is_empty() {
                let existing = self.repo.get_library(service.id, name).await.or_raise(|| ErrorKind::Cache)?;
                report.library_id = existing.as_ref().map(|existing| existing.id);
                for message in messages {
                    let mut log = ServiceLog::new(service.id, LibraryAction::Error, message);
                    if let Some(existing) = &existing {
                        log = log.with_library(existing.id);
                    }
                    self.repo.append_service_log(&log).await.or_raise(|| ErrorKind::Cache)?;
                }
            }
            return Ok(report);
        }

        let library = self.repo.get_or_create_library(service.id, name).await.or_raise(|| ErrorKind::Cache)?;
        report.library_id = Some(library.id);
        if let Some(error) = &observation.metadata_error {
            let message = format!("metadata for `{name}` unavailable: {error}");
            let log = ServiceLog::new(service.id, LibraryAction::Error, message).with_library(library.id);
            self.repo.append_service_log(&log).await.or_raise(|| ErrorKind::Cache)?;
        }
        if let Some(error) = &observation.error {
            let log = ServiceLog::new(service.id, LibraryAction::Error, format!("listing `{name}` ended early: {error}"))
                .with_library(library.id);
            self.repo.append_service_log(&log).await.or_raise(|| ErrorKind::Cache)?;
        }
        if let Some(upstream_name) = observation.metadata.as_ref().and_then(|metadata| metadata.name.as_deref())
            && !library.has_name(upstream_name)
        {
            tracing::warn!(upstream_name, mirrored_name = %library.name, "library name mismatch");
            let log = ServiceLog::new(
                service.id,
                LibraryAction::Error,
                format!("upstream names library `{}` as `{upstream_name}`", library.name),
            )
            .with_library(library.id);
            self.repo.append_service_log(&log).await.or_raise(|| ErrorKind::Cache)?;
            report.mismatched_name = Some(upstream_name.to_string());
        }

        let known = self.repo.list_known_versions(library.key()).await.or_raise(|| ErrorKind::Cache)?;
        let latest = self.repo.latest_retrievals(library.key()).await.or_raise(|| ErrorKind::Cache)?;
        let plan = plan(observation.entries, known, &latest, filter);
        report.unchanged = plan.unchanged;
        report.retired = plan.retired;
        report.filtered = plan.filtered;
        report.staged = plan.decisions.len();

        for rejected in plan.rejected {
            tracing::warn!(version = %rejected.raw, reason = %rejected.reason, "rejected listing entry");
            let log = ServiceLog::new(service.id, LibraryAction::Error, &rejected.reason)
                .with_library(library.id)
                .with_version(&rejected.raw)
                .with_url(&rejected.locator);
            self.repo.append_service_log(&log).await.or_raise(|| ErrorKind::Cache)?;
            report.rejected.push(Failure::new(rejected.raw, rejected.reason));
        }

        if plan.decisions.is_empty() && observation.error.is_none() {
            let log = ServiceLog::new(service.id, LibraryAction::Checked, "checked, no changes").with_library(library.id);
            self.repo.append_service_log(&log).await.or_raise(|| ErrorKind::Cache)?;
            tracing::debug!("checked, no changes");
            return Ok(report);
        }

        let running: FuturesUnordered<_> =
            plan.decisions.into_iter().map(|decision| self.execute(source, &library, decision)).collect();
        settle(running, report).await
    }

    async fn execute(&self, source: &MirrorSource, library: &Library, decision: Decision) -> Result<Outcome> {
        match decision {
            Decision::Add { value, entry } => self.add(source, library, &value, entry).await,
            Decision::Update { version, entry } => self.update(source, library, version, entry).await,
        }
    }

    async fn add(
        &self,
        source: &MirrorSource,
        library: &Library,
        value: &VersionValue,
        entry: ListingEntry,
    ) -> Result<Outcome> {
        let service = &source.service;
        let stored = match content_path_for(service, library, value, &entry.locator) {
            Ok(path) => self.transfer(&source.upstream, &entry.locator, Path::new(&path)).await.map(|_| path),
            Err(err) => Err(err),
        };
        let path = match stored {
            Ok(path) => path,
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => return self.unmirrored(service.id, library, &entry, &err).await,
        };
        match self.record_added(library, entry, &path).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // No row points at the bytes, so nothing would ever clean them up.
                self.discard(Path::new(&path)).await;
                Err(err)
            },
        }
    }

    async fn record_added(&self, library: &Library, entry: ListingEntry, path: &str) -> Result<Outcome> {
        let version = RemoteVersion::new(library.key(), &entry.raw, &entry.locator)
            .or_raise(|| ErrorKind::Cache)?
            .with_provider_data(entry.metadata.clone())
            .with_content_path(path);
        let version = Arc::new(version);
        let log = VersionLog::for_version(Arc::clone(&version), LibraryAction::Added, format!("added {}", version.raw))
            .with_url(&entry.locator)
            .with_provider_data(entry.metadata);
        match self.repo.record_version(&version, &log).await.or_raise(|| ErrorKind::Cache)? {
            InsertOutcome::Inserted => {
                tracing::info!(version = %version.raw, locator = %version.locator, "added version");
                Ok(Outcome::Added(version.raw.clone()))
            },
            InsertOutcome::AlreadyPresent => {
                tracing::debug!(version = %version.raw, "version added concurrently");
                Ok(Outcome::AlreadyPresent(version.raw.clone()))
            },
        }
    }

    /// Same version number, different artifact: an anomaly worth recording,
    /// but the version row itself stays as it was first mirrored.
    async fn update(
        &self,
        source: &MirrorSource,
        library: &Library,
        version: Arc<RemoteVersion>,
        entry: ListingEntry,
    ) -> Result<Outcome> {
        let path = match &version.content_path {
            Some(path) => Ok(path.clone()),
            None => content_path_for(&source.service, library, &version.value, &entry.locator),
        };
        let stored = match path {
            Ok(path) => self.transfer(&source.upstream, &entry.locator, Path::new(&path)).await,
            Err(err) => Err(err),
        };
        match stored {
            Ok(_) => {},
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => return self.failed(&version, &entry.locator, &err).await,
        }

        tracing::warn!(version = %version.raw, locator = %entry.locator, "artifact changed for a mirrored version");
        let log = VersionLog::for_version(
            Arc::clone(&version),
            LibraryAction::Updated,
            format!("artifact of {} changed upstream", version.raw),
        )
        .with_url(&entry.locator)
        .with_provider_data(entry.metadata);
        self.repo.append_log(&log).await.or_raise(|| ErrorKind::Cache)?;
        Ok(Outcome::Updated(version.raw.clone()))
    }

    /// A version that never made it into the store: logged against the service.
    async fn unmirrored(
        &self,
        service_id: Uuid,
        library: &Library,
        entry: &ListingEntry,
        err: &Error,
    ) -> Result<Outcome> {
        let message = (**err).to_string();
        tracing::warn!(version = %entry.raw, locator = %entry.locator, error = %message, "retrieval failed");
        let log = ServiceLog::new(service_id, LibraryAction::Error, &message)
            .with_library(library.id)
            .with_version(&entry.raw)
            .with_url(&entry.locator);
        self.repo.append_service_log(&log).await.or_raise(|| ErrorKind::Cache)?;
        Ok(Outcome::Failed(Failure::new(entry.raw.clone(), message)))
    }

    /// A failure concerning a stored version: logged against the version.
    pub(crate) async fn failed(&self, version: &Arc<RemoteVersion>, locator: &str, err: &Error) -> Result<Outcome> {
        let message = (**err).to_string();
        tracing::warn!(version = %version.raw, %locator, error = %message, "retrieval failed");
        let log = VersionLog::for_version(Arc::clone(version), LibraryAction::Error, &message).with_url(locator);
        self.repo.append_log(&log).await.or_raise(|| ErrorKind::Cache)?;
        Ok(Outcome::Failed(Failure::new(version.raw.clone(), message)))
    }
}

/// Drive staged work to completion, recording every outcome.
///
/// A cancellation is returned only once the siblings have settled, so work
/// that finished before it is still recorded.
pub(crate) async fn settle<F>(mut running: FuturesUnordered<F>, mut report: ServiceReport) -> Result<ServiceReport>
where
    F: Future<Output = Result<Outcome>>,
{
    let mut cancelled = None;
    while let Some(result) = running.next().await {
        match result {
            Ok(outcome) => outcome.record(&mut report),
            Err(err) if err.is_cancelled() => {
                cancelled.get_or_insert(err);
            },
            Err(err) => return Err(err),
        }
    }
    match cancelled {
        Some(err) => Err(err),
        None => Ok(report),
    }
}

/// Read a service's metadata and full listing for `library`.
async fn observe(source: &MirrorSource, library: &str) -> Observation {
    let mut observation = Observation::default();
    match source.upstream.metadata(library).await {
        Ok(metadata) => observation.metadata = Some(metadata),
        Err(err) if matches!(&*err, UpstreamErrorKind::NotFound(_)) => {
            tracing::debug!(service = %source.service.name, library, "no library metadata");
        },
        Err(err) => {
            let error = (*err).to_string();
            tracing::warn!(service = %source.service.name, library, %error, "reading library metadata failed");
            observation.metadata_error = Some(error);
        },
    }
    let mut entries = source.upstream.entries(library);
    while let Some(entry) = entries.next().await {
        match entry {
            Ok(entry) => observation.entries.push(entry),
            Err(err) => {
                let error = (*err).to_string();
                tracing::warn!(service = %source.service.name, library, %error, "listing failed");
                observation.error = Some(error);
                break;
            },
        }
    }
    observation
}
