//! `Datum` definitions for reqlsim.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ast::Func;
use crate::error::{ReqlError, Result};
use crate::types::GroupResults;

/// Key-sorted document body.
pub type Object = BTreeMap<String, Datum>;

/// Runtime value produced and consumed by query evaluation.
///
/// `Literal`, `Func` and `Grouped` are intermediate forms: they flow between
/// operators during a run but are reified away before a result leaves the engine.
#[derive(Debug, Clone)]
pub enum Datum {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Number (the server stores every number as a double).
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence.
    Array(Vec<Datum>),
    /// Document.
    Object(Object),
    /// Point in time, always UTC.
    Time(DateTime<Utc>),
    /// Sentinel below every other value.
    MinVal,
    /// Sentinel above every other value.
    MaxVal,
    /// Merge-time marker: replace instead of deep merging.
    Literal(Box<Datum>),
    /// Function value kept unevaluated for later application.
    Func(Arc<Func>),
    /// One value per group, threaded through later operators.
    Grouped(GroupResults),
}

impl Datum {
    /// Builds an object datum from key/value pairs.
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Datum)>,
    {
        Datum::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns true if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Returns true if this value is a literal wrapper.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Datum::Literal(_))
    }

    /// Attempts to extract a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to extract a bool value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to borrow the elements of an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Datum]> {
        match self {
            Datum::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to borrow the fields of an object (literal payloads included).
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Datum::Object(obj) => Some(obj),
            Datum::Literal(inner) => inner.as_object(),
            _ => None,
        }
    }

    /// Truthiness: only `false` and `null` are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Datum::Null | Datum::Bool(false))
    }

    /// Returns the server-side type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Datum::Null => "NULL",
            Datum::Bool(_) => "BOOL",
            Datum::Number(_) => "NUMBER",
            Datum::String(_) => "STRING",
            Datum::Array(_) => "ARRAY",
            Datum::Object(_) => "OBJECT",
            Datum::Time(_) => "PTYPE<TIME>",
            Datum::MinVal => "MINVAL",
            Datum::MaxVal => "MAXVAL",
            Datum::Literal(_) => "LITERAL",
            Datum::Func(_) => "FUNCTION",
            Datum::Grouped(_) => "GROUPED_DATA",
        }
    }

    /// Converts a sequence-like value into its elements.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the value is not an array.
    pub fn into_sequence(self) -> Result<Vec<Datum>> {
        match self {
            Datum::Array(items) => Ok(items),
            Datum::Literal(inner) => inner.into_sequence(),
            other => Err(ReqlError::Runtime(format!(
                "Expected type ARRAY but found {}.",
                other.type_name()
            ))),
        }
    }

    /// Converts into an object body.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the value is not an object.
    pub fn into_object(self) -> Result<Object> {
        match self {
            Datum::Object(obj) => Ok(obj),
            Datum::Literal(inner) => inner.into_object(),
            other => Err(ReqlError::Runtime(format!(
                "Expected type OBJECT but found {}.",
                other.type_name()
            ))),
        }
    }

    /// Reads a number or fails with a type error.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the value is not a number.
    pub fn expect_number(&self) -> Result<f64> {
        self.as_f64().ok_or_else(|| {
            ReqlError::Runtime(format!(
                "Expected type NUMBER but found {}.",
                self.type_name()
            ))
        })
    }

    /// Reads a string or fails with a type error.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the value is not a string.
    pub fn expect_str(&self) -> Result<&str> {
        self.as_str().ok_or_else(|| {
            ReqlError::Runtime(format!(
                "Expected type STRING but found {}.",
                self.type_name()
            ))
        })
    }

    /// Looks up a field, failing when the document lacks it.
    ///
    /// # Errors
    ///
    /// Returns `NonExistence` for a missing field and `Runtime` when the
    /// value is not an object.
    pub fn get_field(&self, key: &str) -> Result<Datum> {
        match self.as_object() {
            Some(obj) => obj.get(key).cloned().ok_or_else(|| {
                ReqlError::NonExistence(format!("No attribute `{key}` in object: {self}"))
            }),
            None => Err(ReqlError::Runtime(format!(
                "Cannot perform get_field on a non-object non-sequence `{self}`."
            ))),
        }
    }

    /// Lenient field lookup: missing fields and non-objects read as null.
    #[must_use]
    pub fn getter(&self, key: &str) -> Datum {
        self.as_object()
            .and_then(|obj| obj.get(key))
            .cloned()
            .unwrap_or(Datum::Null)
    }

    fn rank(&self) -> u8 {
        match self {
            Datum::MinVal => 0,
            Datum::Null => 1,
            Datum::Bool(_) => 2,
            Datum::Number(_) => 3,
            Datum::String(_) => 4,
            Datum::Time(_) => 5,
            Datum::Array(_) => 6,
            Datum::Object(_) => 7,
            Datum::Literal(_) => 8,
            Datum::Grouped(_) => 9,
            Datum::Func(_) => 10,
            Datum::MaxVal => 11,
        }
    }

    /// Total order used by comparisons, sorting, min/max and ranges.
    ///
    /// Null sorts below every real value; `MinVal`/`MaxVal` bound everything,
    /// including component-wise inside compound (array) keys.
    #[must_use]
    pub fn compare(&self, other: &Datum) -> Ordering {
        match (self, other) {
            (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
            (Datum::Number(a), Datum::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Datum::String(a), Datum::String(b)) => a.cmp(b),
            (Datum::Time(a), Datum::Time(b)) => a.cmp(b),
            (Datum::Array(a), Datum::Array(b)) => compare_seq(a.iter(), b.iter()),
            (Datum::Object(a), Datum::Object(b)) => compare_entries(a, b),
            (Datum::Literal(a), Datum::Literal(b)) => a.compare(b),
            (Datum::Grouped(a), Datum::Grouped(b)) => {
                let left = a.iter().flat_map(|(k, v)| [k, v]);
                let right = b.iter().flat_map(|(k, v)| [k, v]);
                compare_seq(left, right)
            }
            (Datum::Func(a), Datum::Func(b)) => Arc::as_ptr(a).cmp(&Arc::as_ptr(b)),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Converts a JSON value, recognizing `TIME`, `MINVAL` and `MAXVAL` pseudo-types.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Datum::Null,
            Json::Bool(b) => Datum::Bool(*b),
            Json::Number(n) => Datum::Number(n.as_f64().unwrap_or(0.0)),
            Json::String(s) => Datum::String(s.clone()),
            Json::Array(items) => Datum::Array(items.iter().map(Datum::from_json).collect()),
            Json::Object(map) => match map.get("$reql_type$").and_then(Json::as_str) {
                Some("TIME") => map
                    .get("epoch_time")
                    .and_then(Json::as_f64)
                    .and_then(time_from_epoch)
                    .map_or(Datum::Null, Datum::Time),
                Some("MINVAL") => Datum::MinVal,
                Some("MAXVAL") => Datum::MaxVal,
                _ => Datum::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Datum::from_json(v)))
                        .collect(),
                ),
            },
        }
    }

    /// Converts to JSON. Integral numbers are emitted as integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Datum::Null => Json::Null,
            Datum::Bool(b) => Json::Bool(*b),
            Datum::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    Json::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number)
                }
            }
            Datum::String(s) => Json::String(s.clone()),
            Datum::Array(items) => Json::Array(items.iter().map(Datum::to_json).collect()),
            Datum::Object(obj) => Json::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Datum::Time(t) => serde_json::json!({
                "$reql_type$": "TIME",
                "epoch_time": t.timestamp_micros() as f64 / 1_000_000.0,
                "timezone": "+00:00",
            }),
            Datum::MinVal => serde_json::json!({ "$reql_type$": "MINVAL" }),
            Datum::MaxVal => serde_json::json!({ "$reql_type$": "MAXVAL" }),
            Datum::Literal(inner) => inner.to_json(),
            Datum::Func(func) => Json::String(func.to_string()),
            Datum::Grouped(groups) => serde_json::json!({
                "$reql_type$": "GROUPED_DATA",
                "data": groups
                    .iter()
                    .map(|(k, v)| Json::Array(vec![k.to_json(), v.to_json()]))
                    .collect::<Vec<_>>(),
            }),
        }
    }
}

fn compare_seq<'a>(
    mut a: impl Iterator<Item = &'a Datum>,
    mut b: impl Iterator<Item = &'a Datum>,
) -> Ordering {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.compare(y) {
                Ordering::Equal => {}
                unequal => return unequal,
            },
        }
    }
}

fn compare_entries(a: &Object, b: &Object) -> Ordering {
    let mut left = a.iter();
    let mut right = b.iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((ka, va)), Some((kb, vb))) => match ka.cmp(kb).then_with(|| va.compare(vb)) {
                Ordering::Equal => {}
                unequal => return unequal,
            },
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn time_from_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_micros((epoch * 1_000_000.0).round() as i64).single()
}

// Equality follows the total order so that `Eq`/`Ord` agree for set semantics.
impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Datum {}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Datum {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::String(s) => write!(f, "\"{s}\""),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Datum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Datum::from_json(&json))
    }
}

impl From<serde_json::Value> for Datum {
    fn from(value: serde_json::Value) -> Self {
        Datum::from_json(&value)
    }
}

impl From<&Datum> for serde_json::Value {
    fn from(value: &Datum) -> Self {
        value.to_json()
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Number(value)
    }
}

impl From<i64> for Datum {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Datum::Number(value as f64)
    }
}

impl From<i32> for Datum {
    fn from(value: i32) -> Self {
        Datum::Number(f64::from(value))
    }
}

impl From<u64> for Datum {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: u64) -> Self {
        Datum::Number(value as f64)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::String(value.to_string())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::String(value)
    }
}

impl From<Vec<Datum>> for Datum {
    fn from(value: Vec<Datum>) -> Self {
        Datum::Array(value)
    }
}

impl From<Object> for Datum {
    fn from(value: Object) -> Self {
        Datum::Object(value)
    }
}

impl From<DateTime<Utc>> for Datum {
    fn from(value: DateTime<Utc>) -> Self {
        Datum::Time(value)
    }
}
