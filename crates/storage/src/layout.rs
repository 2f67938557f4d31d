//! Deterministic on-disk layout of mirrored content.

use crate::error::{ErrorKind, Result};
use crate::path::validate;
use crate::segment::PathSegment;
use std::path::PathBuf;

/// Where the bytes of one mirrored version live, relative to the content root:
/// `<dir_name>/<library segments>/<version>/<file name>`.
///
/// - `dir_name` is the service's reserved directory and must be one segment.
/// - `library` may span several segments (`@angular/core`).
/// - `version` should be the canonical version form, so equal versions share
///   a directory.
/// - the file name is the last segment of `locator`, ignoring any URL query
///   or fragment.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cdnget_storage::content_path;
///
/// let path = content_path(
///     "cdnjs",
///     "lodash.js",
///     "4.17.21",
///     "https://cdnjs.cloudflare.com/ajax/libs/lodash.js/4.17.21/lodash.min.js?v=1",
/// )
/// .unwrap();
/// assert_eq!(path, Path::new("cdnjs/lodash.js/4.17.21/lodash.min.js"));
/// ```
pub fn content_path(dir_name: &str, library: &str, version: &str, locator: &str) -> Result<PathBuf> {
    let mut segments = vec![PathSegment::empty_root(), PathSegment::named(dir_name)?];
    let library = PathSegment::split(library)?;
    if library.is_empty() {
        exn::bail!(ErrorKind::InvalidSegment(String::new()));
    }
    segments.extend(library);
    segments.push(PathSegment::named(version)?);
    segments.push(file_name(locator)?);
    validate(PathSegment::join(&segments))
}

fn file_name(locator: &str) -> Result<PathSegment> {
    let without_query = locator.split(['?', '#']).next().unwrap_or_default();
    match PathSegment::split(without_query)?.pop() {
        Some(last) => PathSegment::named(last.name()),
        None => exn::bail!(ErrorKind::InvalidSegment(locator.to_string())),
    }
}
