//! Arithmetic, rounding and type coercion.

use chrono::{DateTime, Duration, Utc};

use crate::error::{ReqlError, Result};
use crate::types::{Datum, Object};

fn type_error(op: &str, left: &Datum, right: &Datum) -> ReqlError {
    ReqlError::Runtime(format!(
        "Cannot perform {op} on {} and {}.",
        left.type_name(),
        right.type_name()
    ))
}

/// Largest value a timestamp can be shifted by without leaving `i64` microseconds.
const MAX_SHIFT_MICROS: f64 = 9.0e18;

/// Most elements an array repetition may produce.
const ARRAY_LIMIT: usize = 100_000;

fn out_of_range() -> ReqlError {
    ReqlError::runtime("Time out of range.")
}

#[allow(clippy::cast_possible_truncation)]
fn shift(t: DateTime<Utc>, secs: f64) -> Result<Datum> {
    let micros = (secs * 1_000_000.0).round();
    if !micros.is_finite() || micros.abs() > MAX_SHIFT_MICROS {
        return Err(out_of_range());
    }
    t.checked_add_signed(Duration::microseconds(micros as i64))
        .map(Datum::Time)
        .ok_or_else(out_of_range)
}

/// Adds numbers, concatenates strings and arrays, shifts times by seconds.
pub(super) fn add(left: Datum, right: &Datum) -> Result<Datum> {
    match (left, right) {
        (Datum::Number(a), Datum::Number(b)) => Ok(Datum::Number(a + b)),
        (Datum::String(a), Datum::String(b)) => Ok(Datum::String(a + b)),
        (Datum::Array(mut a), Datum::Array(b)) => {
            a.extend(b.iter().cloned());
            Ok(Datum::Array(a))
        }
        (Datum::Time(t), Datum::Number(n)) => shift(t, *n),
        (left, right) => Err(type_error("add", &left, right)),
    }
}

/// Subtracts numbers; a time minus a number shifts it, minus a time gives seconds.
#[allow(clippy::cast_precision_loss)]
pub(super) fn sub(left: &Datum, right: &Datum) -> Result<Datum> {
    match (left, right) {
        (Datum::Number(a), Datum::Number(b)) => Ok(Datum::Number(a - b)),
        (Datum::Time(t), Datum::Number(n)) => shift(*t, -n),
        (Datum::Time(a), Datum::Time(b)) => {
            let micros = (*a - *b).num_microseconds().unwrap_or(i64::MAX);
            Ok(Datum::Number(micros as f64 / 1_000_000.0))
        }
        _ => Err(type_error("sub", left, right)),
    }
}

/// Multiplies numbers; an array times a number repeats it.
///
/// Repetitions producing more than [`ARRAY_LIMIT`] elements are rejected.
#[allow(clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(super) fn mul(left: Datum, right: &Datum) -> Result<Datum> {
    match (left, right) {
        (Datum::Number(a), Datum::Number(b)) => Ok(Datum::Number(a * b)),
        (Datum::Array(items), Datum::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
            if items.is_empty() {
                return Ok(Datum::Array(items));
            }
            if *n > ARRAY_LIMIT as f64 {
                return Err(over_size_limit());
            }
            let times = *n as usize;
            let total = items
                .len()
                .checked_mul(times)
                .filter(|total| *total <= ARRAY_LIMIT)
                .ok_or_else(over_size_limit)?;
            let mut out = Vec::with_capacity(total);
            for _ in 0..times {
                out.extend(items.iter().cloned());
            }
            Ok(Datum::Array(out))
        }
        (left, right) => Err(type_error("mul", &left, right)),
    }
}

fn over_size_limit() -> ReqlError {
    ReqlError::Runtime(format!("Array over size limit `{ARRAY_LIMIT}`."))
}

pub(super) fn div(left: &Datum, right: &Datum) -> Result<Datum> {
    let (a, b) = (left.expect_number()?, right.expect_number()?);
    if b == 0.0 {
        return Err(ReqlError::runtime("Cannot divide by zero."));
    }
    Ok(Datum::Number(a / b))
}

pub(super) fn modulo(left: &Datum, right: &Datum) -> Result<Datum> {
    let (a, b) = (left.expect_number()?, right.expect_number()?);
    if b == 0.0 {
        return Err(ReqlError::runtime("Cannot divide by zero."));
    }
    if a.fract() != 0.0 || b.fract() != 0.0 {
        return Err(ReqlError::Runtime(format!(
            "Number not an integer: {}",
            if a.fract() == 0.0 { b } else { a }
        )));
    }
    Ok(Datum::Number(a % b))
}

/// Applies `f` to a number (`ceil`, `floor`, `round`).
pub(super) fn round_with(value: &Datum, f: fn(f64) -> f64) -> Result<Datum> {
    Ok(Datum::Number(f(value.expect_number()?)))
}

/// Parses a JSON string into a datum.
pub(super) fn parse_json(value: &Datum) -> Result<Datum> {
    let parsed: serde_json::Value = serde_json::from_str(value.expect_str()?)?;
    Ok(Datum::from_json(&parsed))
}

/// Converts between datum types by name (`array`, `object`, `string`, `number`, `bool`).
pub(super) fn coerce_to(value: Datum, target: &Datum) -> Result<Datum> {
    let target = target.expect_str()?.to_ascii_lowercase();
    let failed = |value: &Datum| {
        ReqlError::Runtime(format!(
            "Cannot coerce {} to {}.",
            value.type_name(),
            target.to_ascii_uppercase()
        ))
    };
    match (target.as_str(), value) {
        ("string", Datum::String(s)) => Ok(Datum::String(s)),
        ("string", other) => Ok(Datum::String(other.to_json().to_string())),
        ("number", Datum::Number(n)) => Ok(Datum::Number(n)),
        ("number", Datum::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Datum::Number)
            .map_err(|_| ReqlError::Runtime(format!("Could not coerce `{s}` to NUMBER."))),
        ("bool", other) => Ok(Datum::Bool(other.is_truthy())),
        ("array", Datum::Object(obj)) => Ok(Datum::Array(
            obj.into_iter()
                .map(|(k, v)| Datum::Array(vec![Datum::String(k), v]))
                .collect(),
        )),
        ("array", Datum::Array(items)) => Ok(Datum::Array(items)),
        ("object", Datum::Object(obj)) => Ok(Datum::Object(obj)),
        ("object", Datum::Array(pairs)) => {
            let mut obj = Object::new();
            for pair in pairs {
                match pair {
                    Datum::Array(kv) if kv.len() == 2 => {
                        let mut kv = kv.into_iter();
                        if let (Some(Datum::String(k)), Some(v)) = (kv.next(), kv.next()) {
                            obj.insert(k, v);
                            continue;
                        }
                        return Err(ReqlError::runtime("Expected a [STRING, value] pair."));
                    }
                    other => return Err(failed(&other)),
                }
            }
            Ok(Datum::Object(obj))
        }
        (_, other) => Err(failed(&other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_add_variants() {
        assert_eq!(add(Datum::from(1), &Datum::from(2)).unwrap(), Datum::from(3));
        assert_eq!(add(Datum::from("a"), &Datum::from("b")).unwrap(), Datum::from("ab"));
        assert_eq!(
            add(Datum::from(json!([1])), &Datum::from(json!([2]))).unwrap(),
            Datum::from(json!([1, 2]))
        );
        assert!(add(Datum::from(1), &Datum::from("x")).is_err());
    }

    #[test]
    fn test_time_arithmetic() {
        let t = Utc.with_ymd_and_hms(2014, 8, 25, 0, 0, 0).unwrap();
        let later = add(Datum::Time(t), &Datum::from(60)).unwrap();
        assert_eq!(sub(&later, &Datum::Time(t)).unwrap(), Datum::from(60));
    }

    #[test]
    fn test_time_shift_out_of_range_is_an_error() {
        let t = Utc.with_ymd_and_hms(2014, 8, 25, 0, 0, 0).unwrap();
        let err = add(Datum::Time(t), &Datum::from(1e13)).unwrap_err();
        assert_eq!(err, ReqlError::runtime("Time out of range."));
        assert!(sub(&Datum::Time(t), &Datum::from(1e13)).is_err());
        assert!(add(Datum::Time(t), &Datum::from(f64::INFINITY)).is_err());
        assert!(add(Datum::Time(t), &Datum::from(1e300)).is_err());
    }

    #[test]
    fn test_array_repetition_limits() {
        assert_eq!(
            mul(Datum::from(json!([1, 2])), &Datum::from(2)).unwrap(),
            Datum::from(json!([1, 2, 1, 2]))
        );
        assert_eq!(
            mul(Datum::from(json!([])), &Datum::from(1e20)).unwrap(),
            Datum::from(json!([]))
        );
        let err = mul(Datum::from(json!([1])), &Datum::from(1e20)).unwrap_err();
        assert!(err.message().starts_with("Array over size limit"));
        assert!(mul(Datum::from(json!([1, 2])), &Datum::from(60_000)).is_err());
    }

    #[test]
    fn test_division_by_zero() {
        assert!(div(&Datum::from(1), &Datum::from(0)).is_err());
        assert!(modulo(&Datum::from(1), &Datum::from(0)).is_err());
        assert_eq!(modulo(&Datum::from(7), &Datum::from(3)).unwrap(), Datum::from(1));
    }

    #[test]
    fn test_coerce_object_array_round_trip() {
        let obj = Datum::from(json!({"a": 1, "b": 2}));
        let pairs = coerce_to(obj.clone(), &Datum::from("array")).unwrap();
        assert_eq!(pairs, Datum::from(json!([["a", 1], ["b", 2]])));
        assert_eq!(coerce_to(pairs, &Datum::from("object")).unwrap(), obj);
        assert_eq!(
            coerce_to(Datum::from("12"), &Datum::from("number")).unwrap(),
            Datum::from(12)
        );
    }
}
