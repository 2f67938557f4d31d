use super::{Token, cmp_ignore_case, hash_ignore_case, parse};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Characters that split a version string into components.
pub const SEPARATORS: [char; 4] = ['.', '-', '+', '_'];

pub(super) fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

/// The value half of an [`Element`].
#[derive(Debug, Clone)]
pub enum Segment {
    /// A numeric run and its suffix.
    Number(Token),
    /// An alphabetic run with no numeric run in front of it (`"v"`, `"beta"`).
    Literal(String),
}
impl Ord for Segment {
    /// Literals sort before numbers; literals compare case-insensitively.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Literal(a), Self::Literal(b)) => cmp_ignore_case(a, b),
            (Self::Literal(_), Self::Number(_)) => Ordering::Less,
            (Self::Number(_), Self::Literal(_)) => Ordering::Greater,
        }
    }
}
impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Segment {}
impl Hash for Segment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Number(token) => {
                state.write_u8(1);
                token.hash(state);
            },
            Self::Literal(literal) => {
                state.write_u8(0);
                hash_ignore_case(literal, state);
            },
        }
    }
}
impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Number(token) => write!(f, "{token}"),
            Self::Literal(literal) => f.write_str(literal),
        }
    }
}

/// A [`Segment`] and the separator that preceded it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element {
    segment: Segment,
    separator: Option<char>,
}
impl Element {
    pub(super) fn new(separator: Option<char>, segment: Segment) -> Self {
        Self { segment, separator }
    }

    pub fn separator(&self) -> Option<char> {
        self.separator
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }
}
impl Ord for Element {
    /// Segment first; the separator only breaks ties (`"1.2"` vs `"1-2"`).
    fn cmp(&self, other: &Self) -> Ordering {
        self.segment.cmp(&other.segment).then_with(|| self.separator.cmp(&other.separator))
    }
}
impl PartialOrd for Element {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(separator) = self.separator {
            write!(f, "{separator}")?;
        }
        write!(f, "{}", self.segment)
    }
}

/// A parsed, totally ordered version.
///
/// Ordering is lexicographic over the elements, and a strict prefix sorts
/// before the longer value: `1.2 < 1.2.0 < 1.2.1`.
///
/// # Canonical form
/// [`Display`] writes the canonical form, which always re-parses to an equal
/// value but is not necessarily byte-identical to the input:
/// - surrounding whitespace is trimmed,
/// - leading zeros are stripped (`"01.002"` → `"1.2"`),
/// - runs of separators collapse to the first (`"1..2"` → `"1.2"`),
/// - leading and trailing separators are dropped, as is a `+` sign.
///
/// # Examples
///
/// ```
/// use cdnget_model::version::VersionValue;
///
/// let a: VersionValue = "1.2".parse().unwrap();
/// let b: VersionValue = "1.2.0".parse().unwrap();
/// let c: VersionValue = "1.2.1".parse().unwrap();
/// assert!(a < b && b < c);
///
/// let messy: VersionValue = " 01..02.3- ".parse().unwrap();
/// assert_eq!(messy.to_string(), "1.2.3");
/// assert_eq!(messy.to_string().parse::<VersionValue>().unwrap(), messy);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionValue {
    elements: Vec<Element>,
}
impl VersionValue {
    pub fn parse(input: impl AsRef<str>) -> Result<Self> {
        Ok(Self { elements: parse::elements(input.as_ref())? })
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// The numeric tokens, in order.
    pub fn numbers(&self) -> impl Iterator<Item = &Token> {
        self.elements.iter().filter_map(|e| match &e.segment {
            Segment::Number(token) => Some(token),
            Segment::Literal(_) => None,
        })
    }

    /// Lowercase canonical form.
    ///
    /// Two values are equal exactly when their keys are equal, which makes
    /// this the storage key for uniqueness checks. Characters are folded one
    /// at a time, as comparison does, never with context-sensitive rules.
    pub fn key(&self) -> String {
        self.to_string().chars().flat_map(char::to_lowercase).collect()
    }
}
impl Ord for VersionValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.elements.iter().cmp(other.elements.iter())
    }
}
impl PartialOrd for VersionValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl FromStr for VersionValue {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
impl TryFrom<&str> for VersionValue {
    type Error = Error;
    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}
impl TryFrom<String> for VersionValue {
    type Error = Error;
    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}
impl Display for VersionValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for element in &self.elements {
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    fn v(s: &str) -> VersionValue {
        VersionValue::parse(s).unwrap()
    }

    #[test]
    fn test_prefix_law() {
        assert!(v("1.2") < v("1.2.0"));
        assert!(v("1.2.0") < v("1.2.1"));
        assert!(v("1.2") < v("1.2.1"));
    }

    #[rstest]
    #[case("1.9", "1.10")]
    #[case("1.0.0-beta", "1.0.0-beta2")]
    #[case("1.0.0-alpha", "1.0.0-BETA")]
    #[case("1.0.0-rc.1", "1.0.0-rc.2")]
    #[case("2a", "2b")]
    #[case("2", "2a")]
    #[case("-1", "0")]
    #[case("1.-2", "1.-1")]
    #[case("v1", "v2")]
    #[case("1.beta", "1.0")]
    #[case("18446744073709551615", "18446744073709551616")]
    #[case("99999999999999999999999999999999999999999", "100000000000000000000000000000000000000000")]
    fn test_strictly_less(#[case] lesser: &str, #[case] greater: &str) {
        assert!(v(lesser) < v(greater), "{lesser} < {greater}");
        assert!(v(greater) > v(lesser), "{greater} > {lesser}");
    }

    #[rstest]
    #[case("1.0.0-RC1", "1.0.0-rc1")]
    #[case("01.02", "1.2")]
    #[case("1..2", "1.2")]
    #[case("+1.2", "1.2")]
    #[case(" 1.2 ", "1.2")]
    #[case(".1.2.", "1.2")]
    fn test_equal(#[case] a: &str, #[case] b: &str) {
        assert_eq!(v(a), v(b));
        assert_eq!(v(a).key(), v(b).key());
    }

    #[rstest]
    #[case("1aΣ", "1aσ")]
    #[case("1.0-ΑΣ", "1.0-ασ")]
    #[case("2ǅ", "2Ǆ")]
    fn test_unicode_key_agrees_with_equality(#[case] a: &str, #[case] b: &str) {
        assert_eq!(v(a), v(b));
        assert_eq!(v(a).key(), v(b).key(), "{a} and {b}");
    }

    #[test]
    fn test_separator_breaks_ties() {
        assert_ne!(v("1.2"), v("1-2"));
        assert_ne!(v("1.2").key(), v("1-2").key());
    }

    #[rstest]
    #[case("4.17.21", "4.17.21")]
    #[case("v1.0.0-beta.2", "v1.0.0-beta.2")]
    #[case("  007.08 ", "7.8")]
    #[case("1..2__3", "1.2_3")]
    #[case("1..2--3", "1.2--3")]
    #[case("1.-2", "1.-2")]
    #[case("1--2", "1--2")]
    #[case("-0", "0")]
    #[case("2a3", "2a3")]
    #[case("rc1", "rc1")]
    #[case("1.2.", "1.2")]
    #[case("1.0+build.5", "1.0+build.5")]
    fn test_canonical_form(#[case] input: &str, #[case] canonical: &str) {
        let parsed = v(input);
        assert_eq!(parsed.to_string(), canonical);
        // parse(format(parse(s))) == parse(s)
        assert_eq!(v(&parsed.to_string()), parsed);
    }

    #[test]
    fn test_sign_only_at_boundaries() {
        let value = v("1-2");
        let numbers: Vec<String> = value.numbers().map(|t| t.to_string()).collect();
        assert_eq!(numbers, ["1", "2"]);
        let value = v("1.-2");
        assert!(value.numbers().nth(1).is_some_and(Token::is_negative));
    }

    #[test]
    fn test_suffix_and_literal_split() {
        let value = v("1.0.0-beta2a");
        let rendered: Vec<(Option<char>, String)> =
            value.elements().iter().map(|e| (e.separator(), e.segment().to_string())).collect();
        assert_eq!(
            rendered,
            [
                (None, "1".to_string()),
                (Some('.'), "0".to_string()),
                (Some('.'), "0".to_string()),
                (Some('-'), "beta".to_string()),
                (None, "2a".to_string()),
            ]
        );
        assert!(matches!(value.elements()[3].segment(), Segment::Literal(_)));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("latest")]
    #[case("1.0 beta")]
    #[case("...")]
    #[case("1.0\u{7}")]
    fn test_invalid(#[case] input: &str) {
        let err = VersionValue::parse(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidVersion(_)));
    }

    #[test]
    fn test_total_order_laws() {
        let samples: Vec<VersionValue> = [
            "0.1", "0.1.0", "1", "1.0", "1.0.0", "1.0.0-alpha", "1.0.0-ALPHA.1", "1.0.0-beta", "1.0.0-rc1", "1.0.1",
            "1.0.1a", "1.0.1b", "1.1", "1.10", "1.2", "1-2", "1_2", "1+2", "2", "-1", "v1", "v1.0", "10.0.0",
            "340282366920938463463374607431768211456", "3.0.0-rc.2", "3.0.0-rc.10",
        ]
        .iter()
        .map(|s| v(s))
        .collect();
        for a in &samples {
            assert_eq!(a.cmp(a), Ordering::Equal);
            for b in &samples {
                // Antisymmetry.
                assert_eq!(a.cmp(b), b.cmp(a).reverse(), "{a} vs {b}");
                assert_eq!(a == b, a.key() == b.key(), "{a} vs {b}");
                for c in &samples {
                    // Transitivity.
                    if a <= b && b <= c {
                        assert!(a <= c, "{a} <= {b} <= {c}");
                    }
                }
            }
        }
        let mut sorted = samples.clone();
        sorted.sort();
        assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
    }
}
