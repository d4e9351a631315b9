//! Table reads by key and table writes.
//!
//! Writes find their target table by walking the primary operand chain
//! ([`Node::find_table_scope`]), apply the change to a new table version and
//! commit a new catalog on the run context.
//!
//! [`Node::find_table_scope`]: crate::ast::Node::find_table_scope

use std::sync::Arc;

use tracing::trace;

use crate::binder::Scope;
use crate::error::{ReqlError, Result};
use crate::executor::{apply, call, Call, Mapper, RunContext};
use crate::semantics::{merge_with, strip_literals, Bound, KeyRange};
use crate::storage::{ConflictPolicy, Table, WriteReport};
use crate::types::{Datum, Object};

/// Resolves the table a write or keyed read addresses.
pub(super) fn target(ctx: &RunContext, site: &Call<'_>, op: &str) -> Result<(String, Arc<Table>)> {
    let scope = site
        .left
        .find_table_scope()
        .ok_or_else(|| ReqlError::Runtime(format!("`{op}` can only be called on a table.")))?;
    let db = ctx.resolve_db(scope.db)?;
    let table = Arc::clone(ctx.catalog().table(&db, scope.table)?);
    Ok((db, table))
}

pub(super) fn commit_table(ctx: &mut RunContext, db: &str, table: Table) -> Result<()> {
    let next = ctx.catalog().with_table(db, table)?;
    ctx.commit(next);
    Ok(())
}

/// Reads every row of a table.
pub(super) fn scan_table(ctx: &RunContext, db: Option<&str>, name: &str) -> Result<Datum> {
    let db = ctx.resolve_db(db)?;
    let table = ctx.catalog().table(&db, name)?;
    Ok(Datum::Array(table.rows().to_vec()))
}

/// Computes index keys per row; the `id` index reads the primary key.
fn keyed_rows(
    table: &Table,
    index: &str,
    ctx: &mut RunContext,
) -> Result<Vec<(Vec<Datum>, Datum)>> {
    if index == "id" && !table.index_exists("id") {
        return Ok(table
            .rows()
            .iter()
            .map(|row| (vec![row.getter("id")], row.clone()))
            .collect());
    }
    let root = Scope::new();
    let pairs = table.index_values(index, |derive, row| call(derive, vec![row.clone()], ctx, &root))?;
    Ok(pairs
        .into_iter()
        .map(|(keys, row)| (keys, row.clone()))
        .collect())
}

pub(super) fn get(id: &Datum, ctx: &mut RunContext, site: &Call<'_>) -> Result<Datum> {
    let (_, table) = target(ctx, site, "get")?;
    Ok(table.get(id).cloned().unwrap_or(Datum::Null))
}

/// Rows whose index key equals one of `keys`, in table order.
///
/// The argument is the list of keys; a non-array argument is a single key.
pub(super) fn get_all(keys: &Datum, ctx: &mut RunContext, site: &Call<'_>) -> Result<Datum> {
    let (_, table) = target(ctx, site, "get_all")?;
    let index = site.opt_str("index", "id")?;
    let wanted: Vec<Datum> = match keys {
        Datum::Array(items) => items.clone(),
        single => vec![single.clone()],
    };
    let rows = keyed_rows(&table, index, ctx)?
        .into_iter()
        .filter(|(row_keys, _)| row_keys.iter().any(|k| wanted.contains(k)))
        .map(|(_, row)| row)
        .collect();
    Ok(Datum::Array(rows))
}

/// Rows with an index key inside `[lower, upper)`, bounds adjustable by options.
pub(super) fn between(
    lower: &Datum,
    upper: &Datum,
    ctx: &mut RunContext,
    site: &Call<'_>,
) -> Result<Datum> {
    let (_, table) = target(ctx, site, "between")?;
    let index = site.opt_str("index", "id")?;
    let range = KeyRange::new(lower.clone(), upper.clone())
        .with_left_bound(Bound::parse(site.opt_str("left_bound", "closed")?)?)
        .with_right_bound(Bound::parse(site.opt_str("right_bound", "open")?)?);
    let rows = keyed_rows(&table, index, ctx)?
        .into_iter()
        .filter(|(row_keys, _)| row_keys.iter().any(|k| range.contains(k)))
        .map(|(_, row)| row)
        .collect();
    Ok(Datum::Array(rows))
}

fn selection(value: Datum) -> Result<Vec<Datum>> {
    match value {
        Datum::Null => Ok(Vec::new()),
        Datum::Object(_) => Ok(vec![value]),
        other => other.into_sequence(),
    }
}

fn same_id(old: &Object, new: &Object) -> Result<()> {
    if old.get("id") == new.get("id") {
        Ok(())
    } else {
        Err(ReqlError::runtime("Primary key `id` cannot be changed."))
    }
}

pub(super) fn insert(docs: Datum, ctx: &mut RunContext, site: &Call<'_>) -> Result<Datum> {
    let (db, table) = target(ctx, site, "insert")?;
    let policy = ConflictPolicy::parse(site.opt_str("conflict", "error")?)?;
    let docs = match docs {
        Datum::Array(items) => items,
        single => vec![single],
    };
    let docs = docs.iter().map(strip_literals).collect();
    let (next, report) = table.insert(docs, policy)?;
    commit_table(ctx, &db, next)?;
    Ok(report.to_datum())
}

/// Merges `patch` (or its result, for a function) into every selected row.
pub(super) fn update(
    value: Datum,
    patch: &Datum,
    ctx: &mut RunContext,
    site: &Call<'_>,
) -> Result<Datum> {
    let (db, _) = target(ctx, site, "update")?;
    let mut updated = Vec::new();
    for row in selection(value)? {
        let change = match patch {
            Datum::Func(func) => apply(func, row.clone(), ctx, site.scope)?,
            other => other.clone(),
        };
        let old = row.into_object()?;
        let new = merge_with(&change, &old)?;
        same_id(&old, &new)?;
        updated.push(Datum::Object(new));
    }
    // re-read: a function patch may have written to the table
    let (_, table) = target(ctx, site, "update")?;
    let (next, report) = table.update_by_id(updated);
    commit_table(ctx, &db, next)?;
    Ok(report.to_datum())
}

/// Substitutes every selected row; a null replacement deletes the row.
pub(super) fn replace(
    value: Datum,
    doc: &Datum,
    ctx: &mut RunContext,
    site: &Call<'_>,
) -> Result<Datum> {
    let (db, _) = target(ctx, site, "replace")?;
    let mut replaced = Vec::new();
    let mut removed = Vec::new();
    for row in selection(value)? {
        let new = match doc {
            Datum::Func(func) => apply(func, row.clone(), ctx, site.scope)?,
            other => other.clone(),
        };
        let old = row.into_object()?;
        match strip_literals(&new) {
            Datum::Null => removed.push(old.get("id").cloned().unwrap_or(Datum::Null)),
            new => {
                let new = new.into_object()?;
                same_id(&old, &new)?;
                replaced.push(Datum::Object(new));
            }
        }
    }
    let (_, table) = target(ctx, site, "replace")?;
    let (next, mut report) = table.update_by_id(replaced);
    let (next, deletions) = next.remove_by_id(&removed);
    report.merge(deletions);
    commit_table(ctx, &db, next)?;
    Ok(report.to_datum())
}

pub(super) fn delete(value: Datum, ctx: &mut RunContext, site: &Call<'_>) -> Result<Datum> {
    let (db, table) = target(ctx, site, "delete")?;
    let ids: Vec<Datum> = selection(value)?
        .iter()
        .map(|row| row.getter("id"))
        .collect();
    let (next, report) = table.remove_by_id(&ids);
    commit_table(ctx, &db, next)?;
    Ok(report.to_datum())
}

pub(super) fn sync(ctx: &mut RunContext, site: &Call<'_>) -> Result<Datum> {
    target(ctx, site, "sync")?;
    Ok(Datum::object([("synced", Datum::from(1))]))
}

/// Folds one write result into the running `for_each` summary.
///
/// Numbers are summed and arrays concatenated; arrays of results are folded
/// element by element.
fn fold_result(acc: &mut Object, result: Datum) -> Result<()> {
    match result {
        Datum::Object(fields) => {
            for (key, value) in fields {
                let combined = match (acc.remove(&key), value) {
                    (Some(Datum::Number(a)), Datum::Number(b)) => Datum::Number(a + b),
                    (Some(Datum::Array(mut a)), Datum::Array(b)) => {
                        a.extend(b);
                        Datum::Array(a)
                    }
                    (_, value) => value,
                };
                acc.insert(key, combined);
            }
            Ok(())
        }
        Datum::Array(results) => results.into_iter().try_for_each(|r| fold_result(acc, r)),
        other => Err(ReqlError::Runtime(format!(
            "FOR_EACH expects one or more basic write queries, got {}.",
            other.type_name()
        ))),
    }
}

/// Runs a write per element and sums the write reports.
pub(super) fn for_each(
    value: Datum,
    body: &Mapper,
    ctx: &mut RunContext,
    scope: &Scope,
) -> Result<Datum> {
    let mut summary = Object::new();
    for item in value.into_sequence()? {
        let result = body.apply(&item, ctx, scope)?;
        fold_result(&mut summary, result)?;
    }
    trace!(keys = summary.len(), "for_each");
    if summary.is_empty() {
        return Ok(WriteReport::default().to_datum());
    }
    Ok(Datum::Object(summary))
}
