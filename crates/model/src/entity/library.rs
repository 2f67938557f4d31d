use super::{non_blank, now};
use crate::error::{ErrorKind, Result};
use crate::identity::{Identified, LibraryKey};
use time::UtcDateTime;
use uuid::Uuid;

/// A named content package as known to one upstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub created_on: UtcDateTime,
    pub modified_on: UtcDateTime,
}
impl Library {
    pub fn new(service_id: Uuid, name: impl AsRef<str>) -> Result<Self> {
        let Some(name) = non_blank(name) else {
            exn::bail!(ErrorKind::MissingField("name"));
        };
        let created_on = now();
        Ok(Self {
            id: Uuid::new_v4(),
            service_id,
            name,
            created_on,
            modified_on: created_on,
        })
    }

    pub fn key(&self) -> LibraryKey {
        LibraryKey::new(self.service_id, self.id)
    }

    /// Library names are unique per service, ignoring ASCII case.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}
impl Identified for Library {
    type Key = LibraryKey;
    fn key(&self) -> LibraryKey {
        Library::key(self)
    }
}

/// Library-level display metadata reported by an upstream listing.
///
/// Single-valued per library, so when several services disagree the most
/// authoritative one wins field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
}
impl LibraryMetadata {
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = non_blank(name);
        self
    }

    pub fn with_description(mut self, description: impl AsRef<str>) -> Self {
        self.description = non_blank(description);
        self
    }

    pub fn with_homepage(mut self, homepage: impl AsRef<str>) -> Self {
        self.homepage = non_blank(homepage);
        self
    }

    pub fn with_license(mut self, license: impl AsRef<str>) -> Self {
        self.license = non_blank(license);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.homepage.is_none() && self.license.is_none()
    }

    /// Fill every field still unset from a less authoritative source.
    pub fn fill_from(&mut self, lower: &LibraryMetadata) {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }
        fill(&mut self.name, &lower.name);
        fill(&mut self.description, &lower.description);
        fill(&mut self.homepage, &lower.homepage);
        fill(&mut self.license, &lower.license);
    }
}
