use super::{normalize_whitespace, now};
use crate::error::{ErrorKind, Result};
use std::cmp::Ordering;
use time::UtcDateTime;
use uuid::Uuid;

/// Priority given to a service registered without one: the least authoritative.
pub const DEFAULT_PRIORITY: u16 = u16::MAX;

/// A registered content-delivery source.
///
/// `name` and `dir_name` are unique across the store, compared
/// case-insensitively. A lower `priority` is more authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamService {
    pub id: Uuid,
    pub name: String,
    pub dir_name: String,
    pub priority: u16,
    pub description: String,
    pub created_on: UtcDateTime,
    pub modified_on: UtcDateTime,
}
impl UpstreamService {
    /// Register a new service with the default priority and no description.
    ///
    /// The name has its whitespace normalized and the directory name is
    /// trimmed; both must be non-empty afterwards.
    pub fn new(name: impl AsRef<str>, dir_name: impl AsRef<str>) -> Result<Self> {
        let created_on = now();
        let service = Self {
            id: Uuid::new_v4(),
            name: normalize_whitespace(name.as_ref()),
            dir_name: dir_name.as_ref().trim().to_string(),
            priority: DEFAULT_PRIORITY,
            description: String::new(),
            created_on,
            modified_on: created_on,
        };
        service.validate()?;
        Ok(service)
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl AsRef<str>) -> Self {
        self.description = description.as_ref().trim().to_string();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            exn::bail!(ErrorKind::MissingField("name"));
        }
        let dir_name = self.dir_name.trim();
        if dir_name.is_empty() {
            exn::bail!(ErrorKind::MissingField("dir_name"));
        }
        if dir_name != self.dir_name || matches!(dir_name, "." | "..") || dir_name.contains(['/', '\\']) {
            exn::bail!(ErrorKind::InvalidData {
                field: "dir_name",
                value: self.dir_name.clone(),
            });
        }
        if self.created_on > self.modified_on {
            exn::bail!(ErrorKind::InvalidData {
                field: "modified_on",
                value: self.modified_on.to_string(),
            });
        }
        Ok(())
    }

    /// Apply the routinely mutated fields. Returns whether anything changed;
    /// `modified_on` only moves when it did.
    pub fn update(&mut self, priority: u16, description: impl AsRef<str>) -> bool {
        let description = description.as_ref().trim();
        if self.priority == priority && self.description == description {
            return false;
        }
        self.priority = priority;
        self.description = description.to_string();
        self.modified_on = now().max(self.created_on);
        true
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(&normalize_whitespace(name))
    }

    /// Most authoritative first; ties broken by name so the order is stable.
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.name.to_ascii_lowercase().cmp(&other.name.to_ascii_lowercase()))
            .then_with(|| self.id.cmp(&other.id))
    }
}
