use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// What a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryAction {
    /// A newly observed version was retrieved and recorded.
    Added,
    /// A known version's artifact changed upstream (same version, new locator or metadata).
    Updated,
    /// An operator retired the version.
    Removed,
    /// An operator re-retrieved a known version.
    Reload,
    /// Retrieval or listing failed.
    Error,
    /// The library was checked and nothing changed.
    Checked,
}
impl LibraryAction {
    pub const ALL: [Self; 6] = [Self::Added, Self::Updated, Self::Removed, Self::Reload, Self::Error, Self::Checked];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Removed => "removed",
            Self::Reload => "reload",
            Self::Error => "error",
            Self::Checked => "checked",
        }
    }

    /// Whether this entry records a successful content retrieval. The most
    /// recent such entry holds the locator and metadata last seen upstream.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Self::Added | Self::Updated | Self::Reload)
    }
}
impl Display for LibraryAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
impl FromStr for LibraryAction {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|action| action.as_str().eq_ignore_ascii_case(s.trim())).ok_or_else(|| {
            exn::Exn::from(ErrorKind::InvalidData {
                field: "action",
                value: s.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("added", LibraryAction::Added)]
    #[case("UPDATED", LibraryAction::Updated)]
    #[case(" removed ", LibraryAction::Removed)]
    #[case("reload", LibraryAction::Reload)]
    #[case("error", LibraryAction::Error)]
    #[case("checked", LibraryAction::Checked)]
    fn test_parse(#[case] input: &str, #[case] expected: LibraryAction) {
        assert_eq!(input.parse::<LibraryAction>().unwrap(), expected);
    }

    #[test]
    fn test_display_round_trips() {
        for action in LibraryAction::ALL {
            assert_eq!(action.to_string().parse::<LibraryAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action() {
        let err = "deleted".parse::<LibraryAction>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData { field: "action", .. }));
    }

    #[test]
    fn test_retrieval_actions() {
        let retrievals: Vec<_> = LibraryAction::ALL.into_iter().filter(LibraryAction::is_retrieval).collect();
        assert_eq!(retrievals, [LibraryAction::Added, LibraryAction::Updated, LibraryAction::Reload]);
    }
}
