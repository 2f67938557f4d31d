use cdnget_model::{LibraryMetadata, UpstreamService};
use uuid::Uuid;

/// A version that could not be mirrored, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub version: String,
    pub message: String,
}
impl Failure {
    pub fn new(version: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            message: message.into(),
        }
    }
}

/// Outcome of one service's pass over one library.
#[derive(Debug, Clone, Default)]
pub struct ServiceReport {
    pub service: String,
    pub service_id: Uuid,
    /// Unset when the service does not carry the library.
    pub library_id: Option<Uuid>,
    /// Add and update decisions, whether or not they succeeded.
    pub staged: usize,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub reloaded: Vec<String>,
    /// Inserted concurrently by another run.
    pub already_present: Vec<String>,
    pub unchanged: usize,
    pub retired: usize,
    pub filtered: usize,
    /// Unusable listing entries.
    pub rejected: Vec<Failure>,
    /// Staged decisions whose retrieval failed; retried on the next pass.
    pub failed: Vec<Failure>,
    /// Why the listing ended early, if it did.
    pub listing_error: Option<String>,
    /// Why library metadata could not be read, other than the library being unknown.
    pub metadata_error: Option<String>,
    /// The upstream's own name for the library, when it disagrees.
    pub mismatched_name: Option<String>,
}
impl ServiceReport {
    pub(crate) fn new(service: &UpstreamService) -> Self {
        Self {
            service: service.name.clone(),
            service_id: service.id,
            ..Self::default()
        }
    }

    /// Nothing was staged: a no-op pass, as opposed to one that was skipped.
    pub fn is_noop(&self) -> bool {
        self.staged == 0
    }
}

/// Outcome of reconciling one library across every service.
#[derive(Debug, Clone, Default)]
pub struct LibraryReport {
    pub library: String,
    /// Display metadata, merged field by field in service precedence order.
    pub metadata: LibraryMetadata,
    /// One report per service, most authoritative first.
    pub services: Vec<ServiceReport>,
}
impl LibraryReport {
    pub fn staged(&self) -> usize {
        self.services.iter().map(|report| report.staged).sum()
    }

    pub fn service(&self, name: &str) -> Option<&ServiceReport> {
        self.services.iter().find(|report| report.service.eq_ignore_ascii_case(name))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Failure)> {
        self.services.iter().flat_map(|report| {
            report.failed.iter().chain(&report.rejected).map(move |failure| (report.service.as_str(), failure))
        })
    }
}

/// A version retired by an explicit removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, Default)]
pub struct RemovalReport {
    pub library: String,
    pub removed: Vec<Removed>,
    pub already_retired: usize,
    /// Versions retired in the store whose content could not be deleted.
    pub content_errors: Vec<Failure>,
}
