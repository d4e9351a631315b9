//! Sequence operators.

use crate::ast::Func;
use crate::binder::Scope;
use crate::error::{ReqlError, Result};
use crate::executor::{apply, call, Call, Mapper, RunContext};
use crate::semantics::{self, group_by, normalize_index, sort_by_many, Bound, Direction};
use crate::types::Datum;

#[allow(clippy::cast_sign_loss)]
fn expect_count(arg: &Datum, op: &str) -> Result<usize> {
    let n = arg.expect_number()?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(ReqlError::Runtime(format!(
            "`{op}` expects a non-negative integer, got {n}."
        )));
    }
    Ok(n as usize)
}

pub(super) fn count(value: &Datum) -> Result<Datum> {
    let n = match value {
        Datum::Array(items) => items.len(),
        Datum::String(s) => s.chars().count(),
        Datum::Object(obj) => obj.len(),
        other => {
            return Err(ReqlError::Runtime(format!(
                "Cannot count {}.",
                other.type_name()
            )))
        }
    };
    Ok(Datum::from(n as u64))
}

pub(super) fn nth(mut seq: Vec<Datum>, index: &Datum) -> Result<Datum> {
    let at = normalize_index(index.expect_number()?, seq.len(), false)?;
    Ok(seq.swap_remove(at))
}

pub(super) fn limit(seq: Vec<Datum>, n: &Datum) -> Result<Datum> {
    let n = expect_count(n, "limit")?;
    Ok(Datum::Array(seq.into_iter().take(n).collect()))
}

pub(super) fn skip(seq: Vec<Datum>, n: &Datum) -> Result<Datum> {
    let n = expect_count(n, "skip")?;
    Ok(Datum::Array(seq.into_iter().skip(n).collect()))
}

/// True if some element equals `probe`, or satisfies it when `probe` is a function.
pub(super) fn contains(
    value: Datum,
    probe: &Datum,
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Datum> {
    let seq = value.into_sequence()?;
    if let Datum::Func(func) = probe {
        for item in seq {
            if apply(func, item, ctx, scope)?.is_truthy() {
                return Ok(Datum::Bool(true));
            }
        }
        return Ok(Datum::Bool(false));
    }
    Ok(Datum::Bool(seq.iter().any(|item| item == probe)))
}

/// `slice(start, end)` over arrays and strings, honoring `left_bound`/`right_bound`.
pub(super) fn slice(value: Datum, start: &Datum, end: &Datum, site: &Call<'_>) -> Result<Datum> {
    let left = Bound::parse(site.opt_str("left_bound", "closed")?)?;
    let right = Bound::parse(site.opt_str("right_bound", "open")?)?;
    let mut from = start.expect_number()?;
    if left == Bound::Open {
        from += 1.0;
    }
    let to = match end {
        Datum::Null => None,
        other => Some(other.expect_number()?),
    };
    let closed = right == Bound::Closed;
    match value {
        Datum::String(s) => {
            let chars: Vec<Datum> = s.chars().map(|c| Datum::String(c.to_string())).collect();
            let picked = semantics::slice(chars, from, to, closed);
            Ok(Datum::String(
                picked.iter().filter_map(Datum::as_str).collect::<String>(),
            ))
        }
        other => Ok(Datum::Array(semantics::slice(
            other.into_sequence()?,
            from,
            to,
            closed,
        ))),
    }
}

/// Stable multi-key sort. Missing fields sort as null.
pub(super) fn order_by(
    seq: Vec<Datum>,
    selectors: &[(Mapper, Direction)],
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Datum> {
    let directions: Vec<Direction> = selectors.iter().map(|(_, d)| *d).collect();
    let mut keyed = Vec::with_capacity(seq.len());
    for item in seq {
        let mut keys = Vec::with_capacity(selectors.len());
        for (selector, _) in selectors {
            keys.push(
                selector
                    .apply_lenient(&item, ctx, scope)?
                    .unwrap_or(Datum::Null),
            );
        }
        keyed.push((keys, item));
    }
    Ok(Datum::Array(sort_by_many(keyed, &directions)))
}

/// Turns grouped data into `[{group, reduction}]`.
pub(super) fn ungroup(value: Datum) -> Result<Datum> {
    match value {
        Datum::Grouped(groups) => Ok(Datum::Array(
            groups
                .into_entries()
                .into_iter()
                .map(|(group, reduction)| {
                    Datum::object([("group", group), ("reduction", reduction)])
                })
                .collect(),
        )),
        other => Err(ReqlError::Runtime(format!(
            "Cannot call `ungroup` on {}.",
            other.type_name()
        ))),
    }
}

/// Buckets a sequence. Elements whose key is missing go to the null group.
pub(super) fn group(
    value: Datum,
    selector: &Mapper,
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Datum> {
    if let Datum::Grouped(_) = value {
        return Err(ReqlError::runtime("Cannot group data that is already grouped."));
    }
    let groups = group_by(value.into_sequence()?, |item| {
        Ok(selector
            .apply_lenient(item, ctx, scope)?
            .unwrap_or(Datum::Null))
    })?;
    Ok(Datum::Grouped(groups))
}

/// Keeps elements the predicate accepts.
///
/// A predicate that hits a missing field rejects the element unless
/// `keep_missing` is set.
pub(super) fn filter(
    seq: Vec<Datum>,
    predicate: &Mapper,
    keep_missing: bool,
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Datum> {
    let mut out = Vec::new();
    for item in seq {
        let keep = match predicate.apply_lenient(&item, ctx, scope)? {
            Some(verdict) => verdict.is_truthy(),
            None => keep_missing,
        };
        if keep {
            out.push(item);
        }
    }
    Ok(Datum::Array(out))
}

pub(super) fn map(
    seq: Vec<Datum>,
    mapper: &Mapper,
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Datum> {
    seq.iter()
        .map(|item| mapper.apply(item, ctx, scope))
        .collect::<Result<Vec<_>>>()
        .map(Datum::Array)
}

/// Maps, dropping elements for which the mapper hits a missing field.
pub(super) fn map_lenient(
    seq: Vec<Datum>,
    mapper: &Mapper,
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Vec<Datum>> {
    let mut out = Vec::with_capacity(seq.len());
    for item in &seq {
        if let Some(mapped) = mapper.apply_lenient(item, ctx, scope)? {
            out.push(mapped);
        }
    }
    Ok(out)
}

pub(super) fn concat_map(
    seq: Vec<Datum>,
    mapper: &Mapper,
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Datum> {
    let mut out = Vec::new();
    for item in &seq {
        out.extend(mapper.apply(item, ctx, scope)?.into_sequence()?);
    }
    Ok(Datum::Array(out))
}

pub(super) fn reduce(
    seq: Vec<Datum>,
    func: &Func,
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Datum> {
    let mut items = seq.into_iter();
    let mut acc = items
        .next()
        .ok_or_else(|| ReqlError::runtime("Cannot reduce over an empty stream."))?;
    for item in items {
        acc = call(func, vec![acc, item], ctx, scope)?;
    }
    Ok(acc)
}
