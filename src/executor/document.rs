//! Document operators: field access, projection and merge.

use crate::binder::Scope;
use crate::error::{ReqlError, Result};
use crate::executor::{apply, sequence, RunContext};
use crate::semantics::merge_with;
use crate::types::{Datum, Object};

/// Field path selector as accepted by `pluck`, `without` and `has_fields`.
#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Field(String),
    Nested(String, Vec<Selector>),
}

fn selectors(arg: &Datum) -> Result<Vec<Selector>> {
    match arg {
        Datum::String(field) => Ok(vec![Selector::Field(field.clone())]),
        Datum::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(selectors(item)?);
            }
            Ok(out)
        }
        Datum::Object(fields) => fields
            .iter()
            .map(|(k, v)| match v {
                Datum::Bool(true) => Ok(Selector::Field(k.clone())),
                nested => Ok(Selector::Nested(k.clone(), selectors(nested)?)),
            })
            .collect(),
        other => Err(ReqlError::Runtime(format!(
            "Invalid path argument `{other}`."
        ))),
    }
}

fn pluck_object(obj: &Object, sels: &[Selector]) -> Object {
    let mut out = Object::new();
    for sel in sels {
        match sel {
            Selector::Field(k) => {
                if let Some(v) = obj.get(k) {
                    out.insert(k.clone(), v.clone());
                }
            }
            Selector::Nested(k, inner) => {
                let picked = match obj.get(k) {
                    Some(Datum::Object(child)) => Datum::Object(pluck_object(child, inner)),
                    Some(Datum::Array(items)) => Datum::Array(
                        items
                            .iter()
                            .filter_map(Datum::as_object)
                            .map(|child| Datum::Object(pluck_object(child, inner)))
                            .collect(),
                    ),
                    _ => continue,
                };
                out.insert(k.clone(), picked);
            }
        }
    }
    out
}

fn without_object(mut obj: Object, sels: &[Selector]) -> Object {
    for sel in sels {
        match sel {
            Selector::Field(k) => {
                obj.remove(k);
            }
            Selector::Nested(k, inner) => {
                if let Some(Datum::Object(child)) = obj.get_mut(k) {
                    *child = without_object(std::mem::take(child), inner);
                }
            }
        }
    }
    obj
}

fn has_all(obj: &Object, sels: &[Selector]) -> bool {
    sels.iter().all(|sel| match sel {
        Selector::Field(k) => obj.get(k).is_some_and(|v| !v.is_null()),
        Selector::Nested(k, inner) => match obj.get(k) {
            Some(Datum::Object(child)) => has_all(child, inner),
            _ => false,
        },
    })
}

/// Strict field access on a document; on a sequence, collects the field
/// from every element that has it.
pub(super) fn get_field(value: Datum, field: &str) -> Result<Datum> {
    match value {
        Datum::Array(items) => Ok(Datum::Array(
            items
                .iter()
                .filter_map(|item| item.as_object().and_then(|obj| obj.get(field)).cloned())
                .collect(),
        )),
        other => other.get_field(field),
    }
}

/// `value[arg]`: a string selects a field, a number selects an element.
pub(super) fn bracket(value: Datum, arg: &Datum) -> Result<Datum> {
    match arg {
        Datum::String(field) => get_field(value, field),
        Datum::Number(_) => sequence::nth(value.into_sequence()?, arg),
        other => Err(ReqlError::Runtime(format!(
            "Expected NUMBER or STRING as second argument to `bracket` but found {}.",
            other.type_name()
        ))),
    }
}

pub(super) fn has_fields(value: Datum, arg: &Datum) -> Result<Datum> {
    let sels = selectors(arg)?;
    match value {
        Datum::Array(items) => Ok(Datum::Array(
            items
                .into_iter()
                .filter(|item| item.as_object().is_some_and(|obj| has_all(obj, &sels)))
                .collect(),
        )),
        other => {
            let obj = other.into_object()?;
            Ok(Datum::Bool(has_all(&obj, &sels)))
        }
    }
}

pub(super) fn pluck(value: Datum, arg: &Datum) -> Result<Datum> {
    let sels = selectors(arg)?;
    match value {
        Datum::Array(items) => items
            .into_iter()
            .map(|item| Ok(Datum::Object(pluck_object(&item.into_object()?, &sels))))
            .collect::<Result<Vec<_>>>()
            .map(Datum::Array),
        other => Ok(Datum::Object(pluck_object(&other.into_object()?, &sels))),
    }
}

pub(super) fn without(value: Datum, arg: &Datum) -> Result<Datum> {
    let sels = selectors(arg)?;
    match value {
        Datum::Array(items) => items
            .into_iter()
            .map(|item| Ok(Datum::Object(without_object(item.into_object()?, &sels))))
            .collect::<Result<Vec<_>>>()
            .map(Datum::Array),
        other => Ok(Datum::Object(without_object(other.into_object()?, &sels))),
    }
}

/// Deep-merges `patch` into a document, or into every document of a sequence.
///
/// A function patch is applied to each document to produce its patch.
pub(super) fn merge(
    value: Datum,
    patch: &Datum,
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Datum> {
    match value {
        Datum::Array(items) => items
            .into_iter()
            .map(|item| merge(item, patch, ctx, scope))
            .collect::<Result<Vec<_>>>()
            .map(Datum::Array),
        doc => {
            let patch = match patch {
                Datum::Func(func) => apply(func, doc.clone(), ctx, scope)?,
                other => other.clone(),
            };
            let base = doc.into_object()?;
            merge_with(&patch, &base).map(Datum::Object)
        }
    }
}

pub(super) fn keys(value: &Datum) -> Result<Datum> {
    let obj = value.as_object().ok_or_else(|| {
        ReqlError::Runtime(format!(
            "Cannot call `keys` on {}.",
            value.type_name()
        ))
    })?;
    Ok(Datum::Array(obj.keys().cloned().map(Datum::String).collect()))
}

pub(super) fn values(value: Datum) -> Result<Datum> {
    Ok(Datum::Array(value.into_object()?.into_values().collect()))
}
