//! Cell values and the coercion rules the join and analytics stages depend on.
//!
//! Input cells arrive as parsed scalars (text, numbers, booleans, blanks). The
//! engine never fails on a malformed cell: it coerces. Failed numeric coercion
//! yields [`CellValue::NotANumber`], which is kept distinct from
//! [`CellValue::Null`] all the way to the output tables.

use std::fmt;

use serde::{Serialize, Serializer};

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Explicit null (e.g. a sector that has no row for a template key).
    Null,
    /// Missing marker: the column is absent from the row, or the source cell was blank.
    Empty,
    Bool(bool),
    /// Always finite; use [`CellValue::from_f64`] to build from arbitrary floats.
    Number(f64),
    Text(String),
    /// Result of a numeric coercion that did not produce a number.
    NotANumber,
    /// Unbounded numeric result (division by zero and friends).
    Infinite { negative: bool },
}

impl CellValue {
    /// Wrap a float, mapping NaN and infinities onto their explicit sentinels.
    pub fn from_f64(n: f64) -> Self {
        if n.is_nan() {
            Self::NotANumber
        } else if n.is_infinite() {
            Self::Infinite { negative: n < 0.0 }
        } else {
            Self::Number(n)
        }
    }

    /// `Null` for `None`, otherwise [`CellValue::from_f64`].
    pub fn from_opt_f64(n: Option<f64>) -> Self {
        n.map(Self::from_f64).unwrap_or(Self::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The string form used as a join key.
    ///
    /// Numbers and their textual spelling produce the same key (`5` and `"5"`).
    pub fn key_string(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Empty => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
            Self::NotANumber => "NaN".to_string(),
            Self::Infinite { negative } => infinity_text(*negative).to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    /// Display form used by exporters: blanks for null/missing, otherwise the key form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null | Self::Empty => Ok(()),
            other => f.write_str(&other.key_string()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null | Self::Empty => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::NotANumber => serializer.serialize_str("NaN"),
            Self::Infinite { negative } => serializer.serialize_str(infinity_text(*negative)),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::from_f64(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

fn infinity_text(negative: bool) -> &'static str {
    if negative {
        "-Infinity"
    } else {
        "Infinity"
    }
}

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Standard string-to-number conversion.
///
/// `Null` → 0, missing → NaN, booleans → 1/0, blank text → 0, unparseable text → NaN.
pub fn to_number(value: &CellValue) -> f64 {
    match value {
        CellValue::Null => 0.0,
        CellValue::Empty => f64::NAN,
        CellValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        CellValue::Number(n) => *n,
        CellValue::Text(s) => parse_numeric_text(s),
        CellValue::NotANumber => f64::NAN,
        CellValue::Infinite { negative } => {
            if *negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }
        }
    }
}

/// Number used for ranking, or `None` when the cell is not rankable.
///
/// A `Null` cell (a sector with no row for the key) ranks at `0`; it is NOT
/// excluded. Only cells whose coercion is NaN are dropped from the ranking.
pub fn to_rankable_number(value: &CellValue) -> Option<f64> {
    let n = to_number(value);
    if n.is_nan() {
        None
    } else {
        Some(n)
    }
}

/// Round half toward positive infinity (`2.5 → 3`, `-2.5 → -2`).
pub fn round_half_up(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Shortest round-trip decimal text for a number.
///
/// Exponent notation below 1e-6 and from 1e21 up; `-0` prints as `0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return infinity_text(n < 0.0).to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let s = format!("{n:e}");
        match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => s,
        }
    } else {
        format!("{n}")
    }
}

fn parse_numeric_text(text: &str) -> f64 {
    let s = text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(n) = parse_radix_literal(s) {
        return n;
    }
    if is_decimal_literal(s) {
        s.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// `0x`/`0o`/`0b` integer literals (unsigned only).
fn parse_radix_literal(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    if bytes.len() < 3 || bytes[0] != b'0' {
        return None;
    }
    let radix = match bytes[1] {
        b'x' | b'X' => 16,
        b'o' | b'O' => 8,
        b'b' | b'B' => 2,
        _ => return None,
    };
    let mut value = 0.0f64;
    for c in s[2..].chars() {
        let digit = c.to_digit(radix)?;
        value = value * radix as f64 + digit as f64;
    }
    Some(value)
}

/// `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        mantissa_digits += i - frac_start;
    }
    if mantissa_digits == 0 {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn null_coerces_to_zero_missing_to_nan() {
        assert_eq!(to_number(&CellValue::Null), 0.0);
        assert!(to_number(&CellValue::Empty).is_nan());
        assert!(to_number(&CellValue::NotANumber).is_nan());
    }

    #[test]
    fn text_coercion() {
        assert_eq!(to_number(&text("42")), 42.0);
        assert_eq!(to_number(&text("  12.5 ")), 12.5);
        assert_eq!(to_number(&text("-3e2")), -300.0);
        assert_eq!(to_number(&text(".5")), 0.5);
        assert_eq!(to_number(&text("5.")), 5.0);
        assert_eq!(to_number(&text("")), 0.0);
        assert_eq!(to_number(&text("   ")), 0.0);
        assert_eq!(to_number(&text("0x1F")), 31.0);
        assert_eq!(to_number(&text("0b101")), 5.0);
        assert_eq!(to_number(&text("Infinity")), f64::INFINITY);
        assert_eq!(to_number(&text("-Infinity")), f64::NEG_INFINITY);
    }

    #[test]
    fn unparseable_text_is_nan() {
        for s in ["abc", "1,000", "inf", "nan", "infinity", "12abc", "1e", "-", "0x", "--1", "-0x10"] {
            assert!(to_number(&text(s)).is_nan(), "expected NaN for {s:?}");
        }
    }

    #[test]
    fn booleans_coerce() {
        assert_eq!(to_number(&CellValue::Bool(true)), 1.0);
        assert_eq!(to_number(&CellValue::Bool(false)), 0.0);
    }

    #[test]
    fn rankable_number_keeps_null_as_zero() {
        assert_eq!(to_rankable_number(&CellValue::Null), Some(0.0));
        assert_eq!(to_rankable_number(&CellValue::Number(7.0)), Some(7.0));
        assert_eq!(to_rankable_number(&CellValue::NotANumber), None);
        assert_eq!(to_rankable_number(&CellValue::Empty), None);
        assert_eq!(to_rankable_number(&text("n/a")), None);
    }

    #[test]
    fn round_half_up_goes_toward_positive_infinity() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(2.4), 2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(0.49999999999999994), 0.0);
    }

    #[test]
    fn key_string_unifies_numbers_and_text() {
        assert_eq!(CellValue::Number(5.0).key_string(), "5");
        assert_eq!(text("5").key_string(), "5");
        assert_eq!(CellValue::Number(5.5).key_string(), "5.5");
        assert_eq!(CellValue::Number(-0.0).key_string(), "0");
        assert_eq!(CellValue::Null.key_string(), "null");
        assert_eq!(CellValue::Empty.key_string(), "");
        assert_eq!(CellValue::Bool(true).key_string(), "true");
    }

    #[test]
    fn format_number_exponent_ranges() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn from_f64_uses_sentinels() {
        assert_eq!(CellValue::from_f64(f64::NAN), CellValue::NotANumber);
        assert_eq!(CellValue::from_f64(f64::INFINITY), CellValue::Infinite { negative: false });
        assert_eq!(CellValue::from_f64(f64::NEG_INFINITY), CellValue::Infinite { negative: true });
        assert_eq!(CellValue::from_opt_f64(None), CellValue::Null);
    }

    #[test]
    fn serializes_sentinels_as_strings() {
        let cells = vec![
            CellValue::Null,
            CellValue::Number(1.5),
            CellValue::NotANumber,
            CellValue::Infinite { negative: false },
            CellValue::Bool(true),
        ];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"[null,1.5,"NaN","Infinity",true]"#);
    }

    #[test]
    fn display_blanks_null_and_missing() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Number(1234.0).to_string(), "1234");
        assert_eq!(CellValue::NotANumber.to_string(), "NaN");
    }
}
