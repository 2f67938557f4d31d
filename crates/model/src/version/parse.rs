use super::value::{Element, Segment, is_separator};
use super::Token;
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use num_bigint::BigUint;

/// Scan a trimmed version string into elements.
///
/// - Digit runs become numeric tokens; the non-digit, non-separator run that
///   directly follows is the token's suffix.
/// - Non-digit runs with no digit run in front of them become literals.
/// - `-`/`+` is a sign only at the start of the string or straight after a
///   separator, and only when a digit follows. Otherwise it is a separator.
/// - Consecutive separators collapse onto the first; leading and trailing
///   separators are dropped.
pub(super) fn elements(input: &str) -> Result<Vec<Element>> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        exn::bail!(ErrorKind::InvalidVersion(input.to_string()));
    }
    let chars: Vec<char> = trimmed.chars().collect();
    let mut elements = Vec::new();
    let mut separator = None;
    let mut at_boundary = true;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let signed = matches!(c, '-' | '+') && at_boundary && chars.get(i + 1).is_some_and(char::is_ascii_digit);
        if signed || c.is_ascii_digit() {
            let start = if signed { i + 1 } else { i };
            let digits_end = scan(&chars, start, |c| c.is_ascii_digit());
            let suffix_end = scan(&chars, digits_end, |c| !c.is_ascii_digit() && !is_separator(c));
            let digits: String = chars[start..digits_end].iter().collect();
            let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10)
                .ok_or_raise(|| ErrorKind::InvalidVersion(input.to_string()))?;
            let suffix: String = chars[digits_end..suffix_end].iter().collect();
            let token = Token::from_parts(signed && c == '-', magnitude, suffix);
            elements.push(Element::new(separator.take(), Segment::Number(token)));
            at_boundary = false;
            i = suffix_end;
        } else if is_separator(c) {
            if !at_boundary {
                separator = Some(c);
            }
            at_boundary = true;
            i += 1;
        } else {
            let end = scan(&chars, i, |c| !c.is_ascii_digit() && !is_separator(c));
            let literal: String = chars[i..end].iter().collect();
            elements.push(Element::new(separator.take(), Segment::Literal(literal)));
            at_boundary = false;
            i = end;
        }
    }
    if !elements.iter().any(|e| matches!(e.segment(), Segment::Number(_))) {
        exn::bail!(ErrorKind::InvalidVersion(input.to_string()));
    }
    Ok(elements)
}

fn scan(chars: &[char], from: usize, accept: impl Fn(char) -> bool) -> usize {
    chars[from..].iter().position(|c| !accept(*c)).map_or(chars.len(), |offset| from + offset)
}
