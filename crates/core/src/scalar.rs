// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tagged-variant scalar value properties and filter literals are made
//! of: a value is an integer iff it matches `-?(0|[1-9][0-9]*)`, otherwise
//! it's a string. The codec normalises at the boundary so the rest of the
//! engine only ever sees a [`Scalar`], never a raw JSON value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A property or filter-literal value: either a string or a 63-bit
/// integer, tagged so equality and ordering never coerce between kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Int(i64),
}

impl Scalar {
    /// Classify a raw literal the way the filter grammar and the property
    /// codec both do: `-?(0|[1-9][0-9]*)` is an integer, anything else is
    /// a string.
    pub fn classify(literal: &str) -> Scalar {
        if is_canonical_integer(literal) {
            if let Ok(value) = literal.parse::<i64>() {
                return Scalar::Int(value);
            }
        }
        Scalar::String(literal.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            Scalar::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::String(_) => None,
        }
    }

    /// Same scalar kind as `other` (both string, or both integer).
    pub fn same_kind(&self, other: &Scalar) -> bool {
        matches!(
            (self, other),
            (Scalar::String(_), Scalar::String(_)) | (Scalar::Int(_), Scalar::Int(_))
        )
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{s}"),
            Scalar::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Matches `-?(0|[1-9][0-9]*)`: an optional leading minus, then either a
/// lone `0` or a non-zero digit followed by more digits. No leading zeros,
/// no `+`, no whitespace.
fn is_canonical_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    match digits.as_bytes() {
        [] => false,
        [b'0'] => true,
        [first, rest @ ..] if first.is_ascii_digit() && *first != b'0' => {
            rest.iter().all(u8::is_ascii_digit)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        zero = { "0", true },
        plain = { "42", true },
        negative = { "-7", true },
        negative_zero = { "-0", true },
        leading_zero = { "007", false },
        plus_sign = { "+5", false },
        empty = { "", false },
        word = { "foo", false },
        trailing_junk = { "42a", false },
        just_minus = { "-", false },
    )]
    fn canonical_integer_detection(input: &str, expected: bool) {
        assert_eq!(is_canonical_integer(input), expected);
    }

    #[test]
    fn classify_picks_int_for_canonical_literals() {
        assert_eq!(Scalar::classify("42"), Scalar::Int(42));
        assert_eq!(Scalar::classify("-3"), Scalar::Int(-3));
    }

    #[test]
    fn classify_picks_string_otherwise() {
        assert_eq!(Scalar::classify("007"), Scalar::String("007".to_string()));
        assert_eq!(Scalar::classify("foo"), Scalar::String("foo".to_string()));
    }

    #[test]
    fn different_kinds_never_same_kind() {
        let s = Scalar::String("1".to_string());
        let i = Scalar::Int(1);
        assert!(!s.same_kind(&i));
    }
}
