use crate::error::{ErrorKind, Result};
use cdnget_model::VersionValue;
use exn::ResultExt;
use std::collections::HashSet;

/// Restricts an operation to an explicit set of versions.
///
/// Versions match by value, so `1.0` also selects `01.0` but not `1.0.0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionFilter {
    only: Option<HashSet<VersionValue>>,
}
impl VersionFilter {
    /// Match every version.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match only the given versions.
    ///
    /// Returns [`ErrorKind::InvalidFilter`] for anything that is not a version.
    pub fn only(versions: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self> {
        let only = versions
            .into_iter()
            .map(|raw| {
                let raw = raw.as_ref();
                VersionValue::parse(raw).or_raise(|| ErrorKind::InvalidFilter(raw.to_string()))
            })
            .collect::<Result<HashSet<_>>>()?;
        Ok(Self { only: Some(only) })
    }

    pub fn matches(&self, value: &VersionValue) -> bool {
        self.only.as_ref().is_none_or(|only| only.contains(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0", true)]
    #[case("01.0", true)]
    #[case("1.0.0", false)]
    #[case("2.0.0-RC1", true)]
    #[case("2.0.0-rc2", false)]
    fn test_only(#[case] raw: &str, #[case] expected: bool) {
        let filter = VersionFilter::only(["1.0", "2.0.0-rc1"]).unwrap();
        assert_eq!(filter.matches(&VersionValue::parse(raw).unwrap()), expected);
    }

    #[test]
    fn test_all_matches_everything() {
        assert!(VersionFilter::all().matches(&VersionValue::parse("0.0.1").unwrap()));
    }

    #[test]
    fn test_invalid_entry() {
        let err = VersionFilter::only(["1.0", "latest"]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidFilter(raw) if raw == "latest"));
    }
}
