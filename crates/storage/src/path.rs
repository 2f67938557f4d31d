//! Relative path validation for storage backends.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Validate and normalize a path relative to the content root.
///
/// `.` components and repeated or trailing delimiters are dropped, and `..`
/// is resolved lexically. The result is rejected with
/// [`InvalidPath`](ErrorKind::InvalidPath) when it:
/// - is empty after normalization,
/// - would climb above the root at any point,
/// - is absolute or carries a platform prefix,
/// - contains a NUL byte or a backslash.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cdnget_storage::validate_path;
///
/// assert_eq!(
///     validate_path("cdnjs//lodash/./4.17.21/lodash.min.js/").unwrap(),
///     Path::new("cdnjs/lodash/4.17.21/lodash.min.js"),
/// );
/// assert!(validate_path("cdnjs/../../etc/passwd").is_err());
/// assert!(validate_path("/etc/passwd").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut normalized = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(name) => {
                let bytes = name.as_encoded_bytes();
                if bytes.contains(&0) || bytes.contains(&b'\\') {
                    exn::bail!(invalid());
                }
                normalized.push(name);
            },
            Component::CurDir => {},
            Component::ParentDir => {
                if normalized.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
            Component::RootDir | Component::Prefix(_) => exn::bail!(invalid()),
        }
    }
    if normalized.is_empty() {
        exn::bail!(invalid());
    }
    Ok(normalized.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("cdnjs/lodash/4.17.21/lodash.min.js", "cdnjs/lodash/4.17.21/lodash.min.js")]
    #[case("jsdelivr//@babel/core///7.0.0", "jsdelivr/@babel/core/7.0.0")]
    #[case("a/./b/./c", "a/b/c")]
    #[case("a/b/..", "a")]
    #[case("wrong/../right/file.js", "right/file.js")]
    #[case("trailing/", "trailing")]
    fn test_normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("./.")]
    #[case("..")]
    #[case("../etc/passwd")]
    #[case("a/../../b")]
    #[case("/etc/passwd")]
    #[case("a\0b")]
    #[case("a\\..\\b")]
    fn test_rejects(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(p) if p == Path::new(input)));
    }
}
