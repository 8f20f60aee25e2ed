use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref DECIMAL_REGEX: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
    static ref INFINITY_REGEX: Regex = Regex::new(r"^([+-]?)Infinity$").unwrap();
    static ref RADIX_REGEX: Regex =
        Regex::new(r"^0(?:[xX]([0-9a-fA-F]+)|[oO]([0-7]+)|[bB]([01]+))$").unwrap();
}

/// A single value read from an uploaded table
///
/// Source files carry loosely typed cells, so every cell is one of a small
/// set of variants. Date-like values are kept as `Text` and only interpreted
/// as dates by the period aggregator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// One record of a dataset, keyed by column name in header order
///
/// Rows may omit columns (short CSV records), so lookups return `Option`.
pub type Row = IndexMap<String, CellValue>;

impl CellValue {
    /// Best-effort conversion to a number
    ///
    /// Never fails: anything that is not a number, a boolean, or a numeric
    /// literal becomes `0`.
    ///
    /// # Examples
    /// ```
    /// use data_vision::cell::CellValue;
    ///
    /// assert_eq!(CellValue::Text(" 12.5 ".to_string()).to_number(), 12.5);
    /// assert_eq!(CellValue::Text("0x1F".to_string()).to_number(), 31.0);
    /// assert_eq!(CellValue::Text("n/a".to_string()).to_number(), 0.0);
    /// assert_eq!(CellValue::Bool(true).to_number(), 1.0);
    /// assert_eq!(CellValue::Null.to_number(), 0.0);
    /// ```
    pub fn to_number(&self) -> f64 {
        let n = match self {
            CellValue::Null => 0.0,
            CellValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            CellValue::Number(n) => *n,
            CellValue::Text(s) => parse_numeric_literal(s).unwrap_or(0.0),
        };
        if n.is_nan() { 0.0 } else { n }
    }

    /// Canonical string form, used as a group key
    ///
    /// Numbers and strings that print the same collapse into the same key,
    /// so `5` and `"5"` are one group.
    ///
    /// # Examples
    /// ```
    /// use data_vision::cell::CellValue;
    ///
    /// assert_eq!(CellValue::Number(5.0).to_key(), "5");
    /// assert_eq!(CellValue::Number(2.25).to_key(), "2.25");
    /// assert_eq!(CellValue::Text("5".to_string()).to_key(), "5");
    /// assert_eq!(CellValue::Null.to_key(), "");
    /// ```
    pub fn to_key(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
        }
    }

    /// Whether the value counts as "empty" when used as a date
    pub fn is_falsy(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Bool(b) => !b,
            CellValue::Number(n) => *n == 0.0 || n.is_nan(),
            CellValue::Text(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Coerce a possibly missing cell to a number (missing counts as `0`)
pub fn coerce(value: Option<&CellValue>) -> f64 {
    value.map_or(0.0, CellValue::to_number)
}

/// Group key of a possibly missing cell
///
/// Missing and `Null` cells both key as the empty string, so rows without a
/// label land in one unnamed group instead of `"null"`/`"undefined"` buckets.
pub fn key_of(value: Option<&CellValue>) -> String {
    value.map(CellValue::to_key).unwrap_or_default()
}

/// Read `column` from `row` and coerce it to a number
pub fn row_number(row: &Row, column: &str) -> f64 {
    coerce(row.get(column))
}

/// Read `column` from `row` as-is; a missing column reads as `Null`
pub fn row_value(row: &Row, column: &str) -> CellValue {
    row.get(column).cloned().unwrap_or(CellValue::Null)
}

/// Parse a numeric literal the way a lenient spreadsheet would
///
/// Surrounding whitespace is ignored and an empty string reads as zero.
/// Accepts decimal and exponent notation, `Infinity`, and `0x`/`0o`/`0b`
/// integer literals. Words like `inf` or `nan` are rejected.
pub fn parse_numeric_literal(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    if DECIMAL_REGEX.is_match(s) {
        return s.parse::<f64>().ok();
    }
    if let Some(caps) = INFINITY_REGEX.captures(s) {
        return Some(if &caps[1] == "-" {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }
    let caps = RADIX_REGEX.captures(s)?;
    let (digits, radix) = if let Some(m) = caps.get(1) {
        (m.as_str(), 16)
    } else if let Some(m) = caps.get(2) {
        (m.as_str(), 8)
    } else {
        (caps.get(3)?.as_str(), 2)
    };
    Some(digits.chars().fold(0.0, |acc, c| {
        acc * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64
    }))
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // -0 prints as 0
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // Exponent form outside [1e-6, 1e21), with an explicit `+` on
        // positive exponents: 1e+21, 1.5e-7
        let exp = format!("{:e}", n);
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exp,
        }
    } else {
        n.to_string()
    }
}
