//! Deep merge with literal override.

use crate::error::{ReqlError, Result};
use crate::types::{Datum, Object};

const NESTED_LITERAL: &str = "No nested r.literal()!";

/// Merges `ext` into `base` and returns the combined document.
///
/// Keys only in `ext` are copied in. Shared keys recurse when both sides are
/// objects, concatenate when both are arrays, and are overwritten by `ext`
/// otherwise. A literal-wrapped value always overwrites outright.
///
/// # Errors
///
/// Returns a runtime error if `ext` is not an object, or if a literal is
/// reachable from another literal's payload. The check runs before any
/// merging happens.
pub fn merge_with(ext: &Datum, base: &Object) -> Result<Object> {
    if has_nested_literal(ext) {
        return Err(ReqlError::runtime(NESTED_LITERAL));
    }
    let ext = ext.as_object().ok_or_else(|| {
        ReqlError::Runtime(format!(
            "Expected type OBJECT but found {}.",
            ext.type_name()
        ))
    })?;
    Ok(merge_checked(ext, base))
}

fn merge_checked(ext: &Object, base: &Object) -> Object {
    let mut out = base.clone();
    for (key, value) in ext {
        let merged = match (base.get(key), value) {
            (Some(_), Datum::Literal(_)) | (None, _) => strip_literals(value),
            (Some(Datum::Object(existing)), Datum::Object(patch)) => {
                Datum::Object(merge_checked(patch, existing))
            }
            (Some(Datum::Array(existing)), Datum::Array(tail)) => {
                let mut joined = existing.clone();
                joined.extend(tail.iter().map(strip_literals));
                Datum::Array(joined)
            }
            (Some(_), other) => strip_literals(other),
        };
        out.insert(key.clone(), merged);
    }
    out
}

/// Returns true if the value is a literal or contains one at any depth.
#[must_use]
pub fn contains_literals(value: &Datum) -> bool {
    match value {
        Datum::Literal(_) => true,
        Datum::Object(obj) => obj.values().any(contains_literals),
        Datum::Array(items) => items.iter().any(contains_literals),
        _ => false,
    }
}

/// Returns true if some literal's payload itself contains a literal.
#[must_use]
pub fn has_nested_literal(value: &Datum) -> bool {
    match value {
        Datum::Literal(payload) => match payload.as_ref() {
            Datum::Object(obj) => obj.values().any(contains_literals),
            Datum::Array(items) => items.iter().any(contains_literals),
            Datum::Literal(_) => true,
            _ => false,
        },
        Datum::Object(obj) => obj.values().any(has_nested_literal),
        Datum::Array(items) => items.iter().any(has_nested_literal),
        _ => false,
    }
}

/// Removes literal wrappers, keeping their payloads.
#[must_use]
pub fn strip_literals(value: &Datum) -> Datum {
    match value {
        Datum::Literal(payload) => strip_literals(payload),
        Datum::Object(obj) => Datum::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), strip_literals(v)))
                .collect(),
        ),
        Datum::Array(items) => Datum::Array(items.iter().map(strip_literals).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: serde_json::Value) -> Object {
        Datum::from(value).into_object().unwrap()
    }

    fn literal(value: serde_json::Value) -> Datum {
        Datum::Literal(Box::new(Datum::from(value)))
    }

    #[test]
    fn test_merge_recurses_and_concatenates() {
        let base = obj(json!({"a": {"x": 1, "y": 2}, "tags": ["p"], "n": 1}));
        let ext = Datum::from(json!({"a": {"y": 3, "z": 4}, "tags": ["q"], "n": 2, "new": true}));
        let merged = merge_with(&ext, &base).unwrap();
        assert_eq!(
            Datum::Object(merged),
            Datum::from(json!({
                "a": {"x": 1, "y": 3, "z": 4},
                "tags": ["p", "q"],
                "n": 2,
                "new": true
            }))
        );
    }

    #[test]
    fn test_literal_overrides_regardless_of_shape() {
        let bases = [
            json!({"a": {"keep": 1}, "b": 0}),
            json!({"a": [1, 2], "b": 0}),
            json!({"a": "scalar", "b": 0}),
            json!({"b": 0}),
        ];
        for base in bases {
            let ext = Datum::object([("a", literal(json!({"only": true})))]);
            let merged = merge_with(&ext, &obj(base)).unwrap();
            assert_eq!(
                Datum::Object(merged),
                Datum::from(json!({"a": {"only": true}, "b": 0}))
            );
        }
    }

    #[test]
    fn test_nested_literal_is_rejected() {
        let inner = literal(json!(1));
        let outer = Datum::Literal(Box::new(Datum::object([("x", inner)])));
        let ext = Datum::object([("a", outer)]);
        let err = merge_with(&ext, &Object::new()).unwrap_err();
        assert_eq!(err, ReqlError::Runtime(NESTED_LITERAL.into()));
    }

    #[test]
    fn test_literal_deep_inside_plain_patch_for_missing_key_is_stripped() {
        let ext = Datum::object([(
            "a",
            Datum::object([("b", literal(json!([1])))]),
        )]);
        let merged = merge_with(&ext, &Object::new()).unwrap();
        assert_eq!(Datum::Object(merged), Datum::from(json!({"a": {"b": [1]}})));
    }
}
