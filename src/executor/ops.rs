//! Operator dispatch for unary, binary, ternary and apply-then-map nodes.

use crate::ast::{BinaryOp, ByFuncOp, Node, TernaryOp, UnaryOp};
use crate::error::{ReqlError, Result};
use crate::executor::{
    admin, apply, document, fan_out, math, sequence, write, Call, Mapper, RunContext,
};
use crate::semantics::{
    change_at, delete_at, distinct, insert_at, max_by, min_by, safe_average, safe_sum,
    set_difference, set_insert, set_intersection, set_union, splice_at,
};
use crate::types::Datum;

fn identity(value: &Datum) -> Result<Option<Datum>> {
    Ok(Some(value.clone()))
}

pub(super) fn unary(
    op: UnaryOp,
    value: Datum,
    ctx: &mut RunContext,
    call: &Call<'_>,
) -> Result<Datum> {
    match op {
        UnaryOp::TypeOf => Ok(Datum::from(value.type_name())),
        UnaryOp::Literal => Ok(Datum::Literal(Box::new(value))),
        UnaryOp::Error => Err(ReqlError::Runtime(match value {
            Datum::String(msg) => msg,
            other => other.to_string(),
        })),
        UnaryOp::Ungroup => sequence::ungroup(value),
        UnaryOp::Delete => write::delete(value, ctx, call),
        UnaryOp::Sync => write::sync(ctx, call),
        UnaryOp::IndexList => admin::index_list(ctx, call),
        UnaryOp::IndexWait => admin::index_wait(ctx, call),
        UnaryOp::Not => fan_out(value, |v| Ok(Datum::Bool(!v.is_truthy()))),
        UnaryOp::IsEmpty => fan_out(value, |v| Ok(Datum::Bool(v.into_sequence()?.is_empty()))),
        UnaryOp::Count => fan_out(value, |v| sequence::count(&v)),
        UnaryOp::Sum => fan_out(value, |v| Ok(Datum::Number(safe_sum(&v.into_sequence()?)))),
        UnaryOp::Avg => fan_out(value, |v| {
            safe_average(&v.into_sequence()?)
                .map(Datum::Number)
                .ok_or_else(|| ReqlError::runtime("Cannot take the average of an empty stream."))
        }),
        UnaryOp::Min => fan_out(value, |v| min_by(v.into_sequence()?, identity)),
        UnaryOp::Max => fan_out(value, |v| max_by(v.into_sequence()?, identity)),
        UnaryOp::Distinct => fan_out(value, |v| Ok(Datum::Array(distinct(v.into_sequence()?)))),
        UnaryOp::Keys => fan_out(value, |v| document::keys(&v)),
        UnaryOp::Values => fan_out(value, |v| document::values(v)),
        UnaryOp::Ceil => fan_out(value, |v| math::round_with(&v, f64::ceil)),
        UnaryOp::Floor => fan_out(value, |v| math::round_with(&v, f64::floor)),
        UnaryOp::Round => fan_out(value, |v| math::round_with(&v, f64::round)),
        UnaryOp::Json => fan_out(value, |v| math::parse_json(&v)),
    }
}

pub(super) fn binary(
    op: BinaryOp,
    value: Datum,
    right: &Node,
    ctx: &mut RunContext,
    call: &Call<'_>,
) -> Result<Datum> {
    let scope = call.scope;
    if matches!(op, BinaryOp::And | BinaryOp::Or) && !matches!(value, Datum::Grouped(_)) {
        // `and` stops at the first falsy value, `or` at the first truthy one.
        let settled = (op == BinaryOp::And) != value.is_truthy();
        return if settled { Ok(value) } else { right.run(ctx, scope) };
    }

    let arg = right.run(ctx, scope)?;
    match op {
        BinaryOp::Get => write::get(&arg, ctx, call),
        BinaryOp::GetAll => write::get_all(&arg, ctx, call),
        BinaryOp::Insert => write::insert(arg, ctx, call),
        BinaryOp::Update => write::update(value, &arg, ctx, call),
        BinaryOp::Replace => write::replace(value, &arg, ctx, call),
        BinaryOp::IndexDrop => admin::index_drop(&arg, ctx, call),

        BinaryOp::Eq => fan_out(value, |v| Ok(Datum::Bool(v == arg))),
        BinaryOp::Ne => fan_out(value, |v| Ok(Datum::Bool(v != arg))),
        BinaryOp::Lt => fan_out(value, |v| Ok(Datum::Bool(v < arg))),
        BinaryOp::Le => fan_out(value, |v| Ok(Datum::Bool(v <= arg))),
        BinaryOp::Gt => fan_out(value, |v| Ok(Datum::Bool(v > arg))),
        BinaryOp::Ge => fan_out(value, |v| Ok(Datum::Bool(v >= arg))),
        BinaryOp::Add => fan_out(value, |v| math::add(v, &arg)),
        BinaryOp::Sub => fan_out(value, |v| math::sub(&v, &arg)),
        BinaryOp::Mul => fan_out(value, |v| math::mul(v, &arg)),
        BinaryOp::Div => fan_out(value, |v| math::div(&v, &arg)),
        BinaryOp::Mod => fan_out(value, |v| math::modulo(&v, &arg)),
        BinaryOp::And => fan_out(value, |v| Ok(if v.is_truthy() { arg.clone() } else { v })),
        BinaryOp::Or => fan_out(value, |v| Ok(if v.is_truthy() { v } else { arg.clone() })),
        BinaryOp::CoerceTo => fan_out(value, |v| math::coerce_to(v, &arg)),

        BinaryOp::Bracket => fan_out(value, |v| document::bracket(v, &arg)),
        BinaryOp::GetField => fan_out(value, |v| document::get_field(v, arg.expect_str()?)),
        BinaryOp::HasFields => fan_out(value, |v| document::has_fields(v, &arg)),
        BinaryOp::Pluck => fan_out(value, |v| document::pluck(v, &arg)),
        BinaryOp::Without => fan_out(value, |v| document::without(v, &arg)),
        BinaryOp::Merge => fan_out(value, |v| document::merge(v, &arg, ctx, scope)),

        BinaryOp::Nth => fan_out(value, |v| sequence::nth(v.into_sequence()?, &arg)),
        BinaryOp::Append => fan_out(value, |v| {
            let mut seq = v.into_sequence()?;
            seq.push(arg.clone());
            Ok(Datum::Array(seq))
        }),
        BinaryOp::Prepend => fan_out(value, |v| {
            let mut seq = v.into_sequence()?;
            seq.insert(0, arg.clone());
            Ok(Datum::Array(seq))
        }),
        BinaryOp::Contains => fan_out(value, |v| sequence::contains(v, &arg, ctx, scope)),
        BinaryOp::Limit => fan_out(value, |v| sequence::limit(v.into_sequence()?, &arg)),
        BinaryOp::Skip => fan_out(value, |v| sequence::skip(v.into_sequence()?, &arg)),
        BinaryOp::Union => fan_out(value, |v| {
            let mut seq = v.into_sequence()?;
            seq.extend(arg.clone().into_sequence()?);
            Ok(Datum::Array(seq))
        }),
        BinaryOp::DeleteAt => fan_out(value, |v| {
            let (start, end) = match &arg {
                Datum::Array(bounds) if bounds.len() == 2 => {
                    (bounds[0].expect_number()?, Some(bounds[1].expect_number()?))
                }
                single => (single.expect_number()?, None),
            };
            delete_at(v.into_sequence()?, start, end).map(Datum::Array)
        }),
        BinaryOp::SetInsert => {
            fan_out(value, |v| Ok(Datum::Array(set_insert(v.into_sequence()?, arg.clone()))))
        }
        BinaryOp::SetUnion => fan_out(value, |v| {
            Ok(Datum::Array(set_union(v.into_sequence()?, arg.clone().into_sequence()?)))
        }),
        BinaryOp::SetIntersection => fan_out(value, |v| {
            let right = arg.clone().into_sequence()?;
            Ok(Datum::Array(set_intersection(v.into_sequence()?, &right)))
        }),
        BinaryOp::SetDifference => fan_out(value, |v| {
            let right = arg.clone().into_sequence()?;
            Ok(Datum::Array(set_difference(v.into_sequence()?, &right)))
        }),
    }
}

pub(super) fn ternary(
    op: TernaryOp,
    value: Datum,
    middle: Datum,
    right: Datum,
    ctx: &mut RunContext,
    call: &Call<'_>,
) -> Result<Datum> {
    match op {
        TernaryOp::Between => write::between(&middle, &right, ctx, call),
        TernaryOp::IndexCreate => admin::index_create(&middle, right, ctx, call),
        TernaryOp::IndexRename => admin::index_rename(&middle, &right, ctx, call),
        TernaryOp::Slice => fan_out(value, |v| sequence::slice(v, &middle, &right, call)),
        TernaryOp::InsertAt => fan_out(value, |v| {
            insert_at(v.into_sequence()?, middle.expect_number()?, right.clone()).map(Datum::Array)
        }),
        TernaryOp::SpliceAt => fan_out(value, |v| {
            let values = right.clone().into_sequence()?;
            splice_at(v.into_sequence()?, middle.expect_number()?, values).map(Datum::Array)
        }),
        TernaryOp::ChangeAt => fan_out(value, |v| {
            change_at(v.into_sequence()?, middle.expect_number()?, right.clone()).map(Datum::Array)
        }),
    }
}

pub(super) fn by_func(
    op: ByFuncOp,
    value: Datum,
    mapper: Datum,
    ctx: &mut RunContext,
    call: &Call<'_>,
) -> Result<Datum> {
    let scope = call.scope;
    match op {
        ByFuncOp::Do => match mapper {
            Datum::Func(func) => apply(&func, value, ctx, scope),
            constant => Ok(constant),
        },
        ByFuncOp::ForEach => write::for_each(value, &Mapper::new(mapper), ctx, scope),
        ByFuncOp::Group => sequence::group(value, &Mapper::new(mapper), ctx, scope),
        ByFuncOp::Filter => {
            let predicate = Mapper::predicate(mapper);
            let keep_missing = call.opt("default").is_some_and(Datum::is_truthy);
            fan_out(value, |v| {
                sequence::filter(v.into_sequence()?, &predicate, keep_missing, ctx, scope)
            })
        }
        ByFuncOp::Map => {
            let mapper = Mapper::new(mapper);
            fan_out(value, |v| sequence::map(v.into_sequence()?, &mapper, ctx, scope))
        }
        ByFuncOp::ConcatMap => {
            let mapper = Mapper::new(mapper);
            fan_out(value, |v| {
                sequence::concat_map(v.into_sequence()?, &mapper, ctx, scope)
            })
        }
        ByFuncOp::Reduce => {
            let Datum::Func(func) = mapper else {
                return Err(ReqlError::compile("`reduce` expects a function."));
            };
            fan_out(value, |v| sequence::reduce(v.into_sequence()?, &func, ctx, scope))
        }
        ByFuncOp::MinBy => {
            let mapper = Mapper::new(mapper);
            fan_out(value, |v| {
                min_by(v.into_sequence()?, |d| mapper.apply_lenient(d, ctx, scope))
            })
        }
        ByFuncOp::MaxBy => {
            let mapper = Mapper::new(mapper);
            fan_out(value, |v| {
                max_by(v.into_sequence()?, |d| mapper.apply_lenient(d, ctx, scope))
            })
        }
        ByFuncOp::SumBy => {
            let mapper = Mapper::new(mapper);
            fan_out(value, |v| {
                let mapped = sequence::map_lenient(v.into_sequence()?, &mapper, ctx, scope)?;
                Ok(Datum::Number(safe_sum(&mapped)))
            })
        }
        ByFuncOp::AvgBy => {
            let mapper = Mapper::new(mapper);
            fan_out(value, |v| {
                let mapped = sequence::map_lenient(v.into_sequence()?, &mapper, ctx, scope)?;
                safe_average(&mapped)
                    .map(Datum::Number)
                    .ok_or_else(|| ReqlError::runtime("Cannot take the average of an empty stream."))
            })
        }
    }
}
