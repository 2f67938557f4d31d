mod action;
mod library;
mod log;
mod service;
mod version;

pub use self::action::LibraryAction;
pub use self::library::{Library, LibraryMetadata};
pub use self::log::{ServiceLog, VersionLog};
pub use self::service::{DEFAULT_PRIORITY, UpstreamService};
pub use self::version::RemoteVersion;
use time::UtcDateTime;

/// The current time, truncated to whole seconds (the precision the store keeps).
pub fn now() -> UtcDateTime {
    let now = UtcDateTime::now();
    now.replace_nanosecond(0).unwrap_or(now)
}

/// Trim, then collapse internal whitespace runs to a single space.
pub(crate) fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed, or `None` when nothing is left.
pub(crate) fn non_blank(value: impl AsRef<str>) -> Option<String> {
    let trimmed = value.as_ref().trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
