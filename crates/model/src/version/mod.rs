//! Version values and their total ordering.
//!
//! A raw upstream version string (`"4.17.21"`, `"1.0.0-beta2"`, `"v3"`) is
//! parsed into a [`VersionValue`]: a sequence of [`Element`]s, each holding
//! either a numeric [`Token`] or a literal run, plus the separator that
//! preceded it.

mod parse;
mod token;
mod value;

pub use self::token::Token;
pub use self::value::{Element, SEPARATORS, Segment, VersionValue};
use std::cmp::Ordering;
use std::hash::Hasher;

/// Case-insensitive ordinal comparison (empty sorts first).
pub(crate) fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars().flat_map(char::to_lowercase).cmp(b.chars().flat_map(char::to_lowercase))
}

pub(crate) fn hash_ignore_case<H: Hasher>(s: &str, state: &mut H) {
    for c in s.chars().flat_map(char::to_lowercase) {
        state.write_u32(u32::from(c));
    }
    // Terminator, so adjacent strings can't shift characters between them.
    state.write_u8(0xff);
}
