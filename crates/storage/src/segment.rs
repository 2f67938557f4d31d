//! Separator-aware path components.

use crate::error::{ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// The canonical delimiter between path segments.
pub const PATH_DELIMITER: char = '/';

/// Delimiters recognized when splitting a raw path. Only
/// [`PATH_DELIMITER`] is ever written back out.
const DELIMITERS: [char; 2] = [PATH_DELIMITER, '\\'];

/// One component of a path: its name plus the delimiter that preceded it.
///
/// Equality and ordering are case-sensitive and ordinal over
/// `(separator, name)`, separator first, so sorted segments follow the order
/// a hierarchical walk visits them.
///
/// # Examples
///
/// ```
/// use cdnget_storage::{PATH_DELIMITER, PathSegment};
///
/// let root = PathSegment::empty_root();
/// assert_eq!(root.separator(), PATH_DELIMITER);
/// assert!(root.name().is_empty());
///
/// let segment = PathSegment::named("  lodash ").unwrap();
/// assert_eq!(segment.name(), "lodash");
/// assert!(PathSegment::named("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSegment {
    separator: char,
    name: String,
}
impl PathSegment {
    /// The implicit root: canonical delimiter, empty name.
    pub fn empty_root() -> Self {
        Self {
            separator: PATH_DELIMITER,
            name: String::new(),
        }
    }

    /// Build a segment from a raw name, trimming surrounding whitespace.
    ///
    /// Without an explicit separator the canonical delimiter is used and the
    /// trimmed name must be non-empty. Names that could walk the tree (`.`,
    /// `..`) or carry a delimiter or NUL byte are always rejected.
    pub fn new(separator: Option<char>, name: impl AsRef<str>) -> Result<Self> {
        let raw = name.as_ref();
        let name = raw.trim();
        let invalid = matches!(name, "." | "..") || name.contains(DELIMITERS) || name.contains('\0');
        if invalid || (separator.is_none() && name.is_empty()) {
            exn::bail!(ErrorKind::InvalidSegment(raw.to_string()));
        }
        Ok(Self {
            separator: separator.unwrap_or(PATH_DELIMITER),
            name: name.to_string(),
        })
    }

    /// A segment with the canonical delimiter and a required name.
    pub fn named(name: impl AsRef<str>) -> Result<Self> {
        Self::new(None, name)
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Split a raw path on `/` or `\` into named segments.
    ///
    /// Each segment records the delimiter in front of it; the first segment
    /// gets the canonical delimiter unless the path itself starts with one.
    /// Empty and whitespace-only components are skipped.
    pub fn split(path: &str) -> Result<Vec<Self>> {
        let mut segments = Vec::new();
        let mut separator = PATH_DELIMITER;
        let mut rest = path;
        loop {
            let (component, next) = match rest.find(DELIMITERS) {
                Some(index) => {
                    let delimiter = rest[index..].chars().next().unwrap_or(PATH_DELIMITER);
                    (&rest[..index], Some((delimiter, &rest[index + delimiter.len_utf8()..])))
                },
                None => (rest, None),
            };
            if !component.trim().is_empty() {
                segments.push(Self::new(Some(separator), component)?);
            }
            match next {
                Some((delimiter, remainder)) => {
                    separator = delimiter;
                    rest = remainder;
                },
                None => break,
            }
        }
        Ok(segments)
    }

    /// Join named segments into a relative path, writing the canonical
    /// delimiter between them. Root segments contribute nothing.
    pub fn join<'a>(segments: impl IntoIterator<Item = &'a PathSegment>) -> PathBuf {
        segments.into_iter().filter(|segment| !segment.is_root()).map(|segment| segment.name.as_str()).collect()
    }
}
impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}{}", self.separator, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[test]
    fn test_explicit_separator_allows_empty_name() {
        let segment = PathSegment::new(Some('\\'), " ").unwrap();
        assert!(segment.is_root());
        assert_eq!(segment.separator(), '\\');
    }

    #[rstest]
    #[case("")]
    #[case("  ")]
    #[case(".")]
    #[case("..")]
    #[case("a/b")]
    #[case("a\\b")]
    #[case("a\0")]
    fn test_invalid_names(#[case] name: &str) {
        let err = PathSegment::named(name).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidSegment(_)));
    }

    #[test]
    fn test_ordering_is_case_sensitive_and_separator_first() {
        let upper = PathSegment::named("Lodash").unwrap();
        let lower = PathSegment::named("lodash").unwrap();
        assert_ne!(upper, lower);
        assert!(upper < lower);
        let backslash = PathSegment::new(Some('\\'), "a").unwrap();
        let slash = PathSegment::new(Some('/'), "z").unwrap();
        // '/' (0x2F) sorts before '\' (0x5C) regardless of name.
        assert!(slash < backslash);
        assert!(PathSegment::empty_root() < PathSegment::named("a").unwrap());
    }

    #[test]
    fn test_split_records_separators() {
        let segments = PathSegment::split("@angular\\core//16.0.0").unwrap();
        let rendered: Vec<String> = segments.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["/@angular", "\\core", "/16.0.0"]);
    }

    #[test]
    fn test_split_trims_and_skips_empty() {
        let segments = PathSegment::split(" lodash / 4.17.21 /").unwrap();
        let names: Vec<&str> = segments.iter().map(PathSegment::name).collect();
        assert_eq!(names, ["lodash", "4.17.21"]);
    }

    #[test]
    fn test_split_rejects_traversal() {
        assert!(PathSegment::split("lodash/../../etc").is_err());
    }

    #[test]
    fn test_join() {
        let mut segments = vec![PathSegment::empty_root()];
        segments.extend(PathSegment::split("a\\b/c").unwrap());
        assert_eq!(PathSegment::join(&segments), Path::new("a/b/c"));
    }
}
