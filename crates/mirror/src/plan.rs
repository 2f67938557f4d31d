//! Pure decision step of a reconciliation pass.
//!
//! Compares one service's upstream listing with what that service already
//! has in the mirror. Nothing here performs I/O, so every outcome of a pass
//! can be decided (and tested) before a single byte is retrieved.

use crate::filter::VersionFilter;
use cdnget_model::{RemoteVersion, VersionLog, VersionValue};
use cdnget_upstream::ListingEntry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// A change a listing asks of the mirror.
#[derive(Debug, Clone)]
pub enum Decision {
    /// The version is not mirrored for this service yet.
    Add { value: VersionValue, entry: ListingEntry },
    /// The version is mirrored, but the artifact behind it changed since it
    /// was last retrieved.
    Update { version: Arc<RemoteVersion>, entry: ListingEntry },
}
impl Decision {
    pub fn entry(&self) -> &ListingEntry {
        match self {
            Self::Add { entry, .. } | Self::Update { entry, .. } => entry,
        }
    }
}

/// A listing entry that cannot be mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub raw: String,
    pub locator: String,
    pub reason: String,
}
impl Rejected {
    fn new(entry: &ListingEntry, reason: impl Into<String>) -> Self {
        Self {
            raw: entry.raw.clone(),
            locator: entry.locator.clone(),
            reason: reason.into(),
        }
    }
}

/// Everything decided for one (service, library) pair.
#[derive(Debug, Default)]
pub struct Plan {
    pub decisions: Vec<Decision>,
    /// Mirrored and identical to the last retrieval.
    pub unchanged: usize,
    /// Listed again after an explicit removal; never re-added implicitly.
    pub retired: usize,
    /// Excluded by the version filter.
    pub filtered: usize,
    /// Listed more than once under the same version value.
    pub duplicates: usize,
    pub rejected: Vec<Rejected>,
}

/// Decide what `entries` require of a service's mirror.
///
/// `known` holds every version row of the pair, retired ones included, and
/// `latest` the most recent retrieval log entry per version id. Versions the
/// listing no longer mentions are left alone.
pub fn plan(
    entries: Vec<ListingEntry>,
    known: Vec<RemoteVersion>,
    latest: &HashMap<Uuid, VersionLog>,
    filter: &VersionFilter,
) -> Plan {
    let known: HashMap<VersionValue, Arc<RemoteVersion>> =
        known.into_iter().map(|version| (version.value.clone(), Arc::new(version))).collect();
    let mut seen = HashSet::new();
    let mut plan = Plan::default();
    for entry in entries {
        let value = match VersionValue::parse(&entry.raw) {
            Ok(value) => value,
            Err(err) => {
                plan.rejected.push(Rejected::new(&entry, (*err).to_string()));
                continue;
            },
        };
        if entry.locator.trim().is_empty() {
            plan.rejected.push(Rejected::new(&entry, "missing content locator"));
            continue;
        }
        if !filter.matches(&value) {
            plan.filtered += 1;
            continue;
        }
        // Within one listing the first spelling of a version wins.
        if !seen.insert(value.clone()) {
            plan.duplicates += 1;
            continue;
        }
        match known.get(&value) {
            None => plan.decisions.push(Decision::Add { value, entry }),
            Some(version) if version.is_retired() => plan.retired += 1,
            Some(version) if has_changed(version, latest.get(&version.id), &entry) => {
                plan.decisions.push(Decision::Update {
                    version: Arc::clone(version),
                    entry,
                });
            },
            Some(_) => plan.unchanged += 1,
        }
    }
    plan
}

/// The latest retrieval log entry is authoritative over the immutable row.
fn has_changed(version: &RemoteVersion, latest: Option<&VersionLog>, entry: &ListingEntry) -> bool {
    let (locator, provider_data) = match latest {
        Some(log) => (log.url.as_deref().unwrap_or(&version.locator), log.provider_data.as_ref()),
        None => (version.locator.as_str(), version.provider_data.as_ref()),
    };
    locator != entry.locator.trim() || provider_data != entry.metadata.as_ref()
}
