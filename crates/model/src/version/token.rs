use super::{cmp_ignore_case, hash_ignore_case};
use crate::error::{Error, ErrorKind, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// One numeric run of a version string plus the non-numeric suffix directly
/// following it (`"2a"` is the value `2` with suffix `"a"`).
///
/// Sign and magnitude are stored separately so comparisons against unsigned
/// and arbitrary-precision integers never overflow. Zero is never negative.
///
/// # Ordering
/// 1. Numeric value, as a signed arbitrary-precision integer.
/// 2. Suffix, case-insensitively; the empty suffix sorts first.
///
/// # Examples
///
/// ```
/// use cdnget_model::version::Token;
///
/// let plain = Token::from(2u8);
/// let suffixed = Token::new(2, "a").unwrap();
/// assert!(plain < suffixed);
/// assert!(Token::from(u64::MAX) > Token::from(i64::MAX));
/// assert_eq!(Token::new(2, "RC").unwrap(), Token::new(2u64, "rc").unwrap());
/// assert!(Token::new(1, "2").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Token {
    negative: bool,
    magnitude: BigUint,
    suffix: String,
}
impl Token {
    /// Create a token from any integer convertible into a [`BigInt`].
    ///
    /// Returns [`InvalidSuffix`](ErrorKind::InvalidSuffix) if the suffix
    /// starts with a digit.
    pub fn new(value: impl Into<BigInt>, suffix: impl Into<String>) -> Result<Self> {
        let suffix = suffix.into();
        if suffix.starts_with(|c: char| c.is_ascii_digit()) {
            exn::bail!(ErrorKind::InvalidSuffix(suffix));
        }
        let (sign, magnitude) = value.into().into_parts();
        Ok(Self::from_parts(sign == Sign::Minus, magnitude, suffix))
    }

    /// Parser-side constructor; the scanner guarantees the suffix never
    /// starts with a digit.
    pub(crate) fn from_parts(negative: bool, magnitude: BigUint, suffix: String) -> Self {
        let negative = negative && !magnitude.is_zero();
        Self { negative, magnitude, suffix }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn magnitude(&self) -> &BigUint {
        &self.magnitude
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The signed numeric value, without the suffix.
    pub fn value(&self) -> BigInt {
        let sign = match self.negative {
            true => Sign::Minus,
            false => Sign::Plus,
        };
        BigInt::from_biguint(sign, self.magnitude.clone())
    }

    fn cmp_value(&self, negative: bool, magnitude: &BigUint) -> Ordering {
        match (self.negative, negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.magnitude.cmp(magnitude),
            (true, true) => magnitude.cmp(&self.magnitude),
        }
    }

    /// Compare against a bare integer.
    ///
    /// Fixed-width integers convert up to [`BigInt`] and come through here,
    /// so every width shares the same code path. A token is only equal to an
    /// integer when its suffix is empty; any suffix sorts after the bare value.
    pub fn cmp_integer(&self, other: &BigInt) -> Ordering {
        let negative = other.sign() == Sign::Minus;
        self.cmp_value(negative, other.magnitude()).then(match self.suffix.is_empty() {
            true => Ordering::Equal,
            false => Ordering::Greater,
        })
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_value(other.negative, &other.magnitude)
            .then_with(|| cmp_ignore_case(&self.suffix, &other.suffix))
    }
}
impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Token {}
impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.negative.hash(state);
        self.magnitude.hash(state);
        hash_ignore_case(&self.suffix, state);
    }
}

impl PartialEq<BigInt> for Token {
    fn eq(&self, other: &BigInt) -> bool {
        self.cmp_integer(other) == Ordering::Equal
    }
}
impl PartialOrd<BigInt> for Token {
    fn partial_cmp(&self, other: &BigInt) -> Option<Ordering> {
        Some(self.cmp_integer(other))
    }
}

macro_rules! integer_conversions {
    ($($int:ty),* $(,)?) => {$(
        impl From<$int> for Token {
            fn from(value: $int) -> Self {
                let (sign, magnitude) = BigInt::from(value).into_parts();
                Self::from_parts(sign == Sign::Minus, magnitude, String::new())
            }
        }
        impl PartialEq<$int> for Token {
            fn eq(&self, other: &$int) -> bool {
                self.cmp_integer(&BigInt::from(*other)) == Ordering::Equal
            }
        }
        impl PartialOrd<$int> for Token {
            fn partial_cmp(&self, other: &$int) -> Option<Ordering> {
                Some(self.cmp_integer(&BigInt::from(*other)))
            }
        }
    )*};
}
integer_conversions!(i8, u8, i16, u16, i32, u32, i64, u64, i128, u128, isize, usize);

impl From<BigInt> for Token {
    fn from(value: BigInt) -> Self {
        let (sign, magnitude) = value.into_parts();
        Self::from_parts(sign == Sign::Minus, magnitude, String::new())
    }
}

impl FromStr for Token {
    type Err = Error;
    /// Parse a single `[+-]digits[suffix]` token.
    fn from_str(s: &str) -> Result<Self> {
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let split = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (digits, suffix) = rest.split_at(split);
        let magnitude = match digits.is_empty() {
            true => None,
            false => BigUint::parse_bytes(digits.as_bytes(), 10),
        };
        let Some(magnitude) = magnitude else {
            exn::bail!(ErrorKind::InvalidVersion(s.to_string()));
        };
        Ok(Self::from_parts(negative, magnitude, suffix.to_string()))
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{}{}", self.magnitude, self.suffix)
    }
}
