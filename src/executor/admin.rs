//! Database, table and index administration.

use std::sync::Arc;

use crate::ast::{AdminOp, Func};
use crate::error::Result;
use crate::executor::write::{commit_table, target};
use crate::executor::{Call, RunContext};
use crate::types::Datum;

fn counter(key: &str) -> Datum {
    Datum::object([(key, Datum::from(1))])
}

fn names(list: Vec<String>) -> Datum {
    Datum::Array(list.into_iter().map(Datum::String).collect())
}

pub(super) fn run_admin(op: &AdminOp, ctx: &mut RunContext) -> Result<Datum> {
    match op {
        AdminOp::DbList => Ok(names(ctx.catalog().list_dbs())),
        AdminOp::DbCreate(name) => {
            let next = ctx.catalog().create_db(name)?;
            ctx.commit(next);
            Ok(counter("dbs_created"))
        }
        AdminOp::DbDrop(name) => {
            let dropped_tables = ctx.catalog().db(name)?.list_tables().len();
            let next = ctx.catalog().drop_db(name)?;
            ctx.commit(next);
            Ok(Datum::object([
                ("dbs_dropped", Datum::from(1)),
                ("tables_dropped", Datum::from(dropped_tables as u64)),
            ]))
        }
        AdminOp::TableList { db } => {
            let db = ctx.resolve_db(db.as_deref())?;
            Ok(names(ctx.catalog().db(&db)?.list_tables()))
        }
        AdminOp::TableCreate { db, name } => {
            let db = ctx.resolve_db(db.as_deref())?;
            let database = ctx.catalog().db(&db)?.create_table(name)?;
            let next = ctx.catalog().with_database(database);
            ctx.commit(next);
            Ok(counter("tables_created"))
        }
        AdminOp::TableDrop { db, name } => {
            let db = ctx.resolve_db(db.as_deref())?;
            let database = ctx.catalog().db(&db)?.drop_table(name)?;
            let next = ctx.catalog().with_database(database);
            ctx.commit(next);
            Ok(counter("tables_dropped"))
        }
    }
}

pub(super) fn index_list(ctx: &mut RunContext, site: &Call<'_>) -> Result<Datum> {
    let (_, table) = target(ctx, site, "index_list")?;
    Ok(names(table.list_indexes()))
}

pub(super) fn index_wait(ctx: &mut RunContext, site: &Call<'_>) -> Result<Datum> {
    let (_, table) = target(ctx, site, "index_wait")?;
    Ok(Datum::Array(
        table
            .list_indexes()
            .into_iter()
            .map(|index| {
                Datum::object([("index", Datum::String(index)), ("ready", Datum::Bool(true))])
            })
            .collect(),
    ))
}

/// Creates an index from a function, a field name, or (when null) the index name itself.
pub(super) fn index_create(
    name: &Datum,
    derive: Datum,
    ctx: &mut RunContext,
    site: &Call<'_>,
) -> Result<Datum> {
    let (db, table) = target(ctx, site, "index_create")?;
    let name = name.expect_str()?;
    let derive = match derive {
        Datum::Func(func) => func,
        Datum::Null => Arc::new(Func::field(name)),
        other => Arc::new(Func::field(other.expect_str()?)),
    };
    let multi = site.opt("multi").is_some_and(Datum::is_truthy);
    commit_table(ctx, &db, table.create_index(name, derive, multi)?)?;
    Ok(counter("created"))
}

pub(super) fn index_drop(name: &Datum, ctx: &mut RunContext, site: &Call<'_>) -> Result<Datum> {
    let (db, table) = target(ctx, site, "index_drop")?;
    commit_table(ctx, &db, table.drop_index(name.expect_str()?)?)?;
    Ok(counter("dropped"))
}

pub(super) fn index_rename(
    old: &Datum,
    new: &Datum,
    ctx: &mut RunContext,
    site: &Call<'_>,
) -> Result<Datum> {
    let (db, table) = target(ctx, site, "index_rename")?;
    let renamed = table.rename_index(old.expect_str()?, new.expect_str()?)?;
    commit_table(ctx, &db, renamed)?;
    Ok(counter("renamed"))
}
