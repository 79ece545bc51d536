//! Legacy portal payload ingestion
//!
//! The portal answers with differently shaped bodies depending on the
//! endpoint: a bare list of rows, a single row, or either of those wrapped in
//! a `{ "success": true, "data": ... }` envelope. Everything is collapsed into
//! [`LegacyPayload`] at the boundary so downstream code only ever sees a
//! sequence of [`LegacyRecord`]s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// One raw row from the legacy portal, in its native field naming
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyRecord(Map<String, Value>);

impl LegacyRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Field value, treating JSON `null` the same as an absent key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Lenient integer interpretation (`"42"`, `42`, `42.9` and `true` all count)
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(lenient_int)
    }

    /// Lenient float interpretation; blank strings are treated as absent
    pub fn float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            other => lenient_float(other),
        }
    }

    /// Field rendered as text; numbers and booleans are stringified
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            other => other.to_string(),
        })
    }

    /// Tri-state flag: absent stays `None`, otherwise true iff the integer value is 1
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|value| lenient_int(value) == Some(1))
    }
}

/// Shape of a legacy response body
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyPayload {
    /// A single associative record
    Single(LegacyRecord),
    /// A list of records
    Many(Vec<LegacyRecord>),
}

impl LegacyPayload {
    /// Classify a decoded JSON body
    ///
    /// Lists must contain only objects. An object carrying both `success` and
    /// `data` keys is an envelope and is unwrapped; any other object is a
    /// single record.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Object(fields) => Ok(LegacyRecord(fields)),
                    other => Err(Error::InvalidPayload(format!(
                        "list item {} is {}, expected an object",
                        index,
                        json_kind(&other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Many),
            Value::Object(mut fields) => {
                if fields.contains_key("success") && fields.contains_key("data") {
                    return match fields.remove("data") {
                        Some(Value::Null) | None => Ok(Self::Many(Vec::new())),
                        Some(inner) => Self::from_value(inner),
                    };
                }
                Ok(Self::Single(LegacyRecord(fields)))
            }
            other => Err(Error::InvalidPayload(format!(
                "body is {}, expected an object or a list",
                json_kind(&other)
            ))),
        }
    }

    /// Collapse to a sequence; a single record becomes a one-element list
    pub fn into_records(self) -> Vec<LegacyRecord> {
        match self {
            Self::Single(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

impl From<Vec<LegacyRecord>> for LegacyPayload {
    fn from(records: Vec<LegacyRecord>) -> Self {
        Self::Many(records)
    }
}

impl From<LegacyRecord> for LegacyPayload {
    fn from(record: LegacyRecord) -> Self {
        Self::Single(record)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Integer cast in the spirit of the portal's loose typing
///
/// Strings parse as integers, then as floats (truncated), then by their
/// leading digits; anything unparsable is 0. Lists and objects have no
/// integer value.
fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => Some(int_from_str(s)),
    }
}

fn lenient_float(value: &Value) -> Option<f64> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(float_from_str(s)),
    }
}

fn int_from_str(raw: &str) -> i64 {
    let s = raw.trim();
    if let Ok(i) = s.parse::<i64>() {
        return i;
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() {
            return f.trunc() as i64;
        }
    }
    leading_number(s).trunc() as i64
}

fn float_from_str(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() => f,
        _ => leading_number(&cleaned),
    }
}

/// Numeric value of the longest `[-+]?digits[.digits]` prefix, or 0
fn leading_number(s: &str) -> f64 {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '-' | '+' if i == 0 => end = i + 1,
            '0'..='9' => end = i + 1,
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    s[..end].trim_end_matches('.').parse::<f64>().unwrap_or(0.0)
}
