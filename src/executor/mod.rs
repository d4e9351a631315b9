//! Tree-walking evaluator.
//!
//! Every [`Node`] evaluates through [`Node::run`] against a per-run
//! [`RunContext`] and a [`Scope`]. Operand evaluation order is left to right.
//! When the primary operand yields grouped data the operator is applied to
//! each group independently through [`fan_out`].

mod admin;
mod document;
mod math;
mod ops;
mod sequence;
mod write;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::ast::{Func, Node, OptArgs};
use crate::binder::Scope;
use crate::catalog::Catalog;
use crate::error::{ReqlError, Result};
use crate::types::{Datum, Object};

/// State pinned for the duration of one query run.
#[derive(Debug, Clone)]
pub struct RunContext {
    catalog: Arc<Catalog>,
    now: DateTime<Utc>,
    default_db: Option<String>,
    mutated: bool,
}

impl RunContext {
    /// Creates a context over a catalog snapshot.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, now: DateTime<Utc>, default_db: Option<String>) -> Self {
        RunContext {
            catalog,
            now,
            default_db,
            mutated: false,
        }
    }

    /// Returns the catalog as seen by this run so far.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Returns the instant `now` evaluates to for this run.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Returns the database used when a query names none.
    #[must_use]
    pub fn default_db(&self) -> Option<&str> {
        self.default_db.as_deref()
    }

    /// Resolves an optional database name against the run's default.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if neither is set.
    pub fn resolve_db(&self, db: Option<&str>) -> Result<String> {
        db.or(self.default_db())
            .map(ToString::to_string)
            .ok_or_else(|| ReqlError::runtime("No database selected and no default database set."))
    }

    /// Installs a new catalog version produced by a write.
    pub fn commit(&mut self, catalog: Catalog) {
        trace!(dbs = catalog.list_dbs().len(), "commit catalog");
        self.catalog = Arc::new(catalog);
        self.mutated = true;
    }

    /// Returns true once any write has been committed.
    #[must_use]
    pub fn is_mutated(&self) -> bool {
        self.mutated
    }

    /// Consumes the context, returning the final catalog.
    #[must_use]
    pub fn into_catalog(self) -> Arc<Catalog> {
        self.catalog
    }
}

impl Node {
    /// Evaluates this node.
    ///
    /// # Errors
    ///
    /// Propagates any error raised by this node or its operands.
    pub fn run(&self, ctx: &mut RunContext, scope: &Scope) -> Result<Datum> {
        match self {
            Node::Datum(value) => Ok(value.clone()),
            Node::Var(name) => scope.get(name).cloned(),
            Node::Func(func) => Ok(Datum::Func(Arc::clone(func))),
            Node::MakeArray(items) => items
                .iter()
                .map(|item| item.run(ctx, scope))
                .collect::<Result<Vec<_>>>()
                .map(Datum::Array),
            Node::MakeObject(pairs) => {
                let mut obj = Object::new();
                for (key, value) in pairs {
                    obj.insert(key.clone(), value.run(ctx, scope)?);
                }
                Ok(Datum::Object(obj))
            }
            Node::Now => Ok(Datum::Time(ctx.now())),
            Node::Table { db, name } => write::scan_table(ctx, db.as_deref(), name),
            Node::Admin(op) => admin::run_admin(op, ctx),
            Node::Unary { op, left, opts } => {
                let value = left.run(ctx, scope)?;
                let call = Call::new(left, opts, scope);
                ops::unary(*op, value, ctx, &call)
            }
            Node::Binary {
                op,
                left,
                right,
                opts,
            } => {
                let value = left.run(ctx, scope)?;
                let call = Call::new(left, opts, scope);
                ops::binary(*op, value, right, ctx, &call)
            }
            Node::Ternary {
                op,
                left,
                middle,
                right,
                opts,
            } => {
                let value = left.run(ctx, scope)?;
                let middle = middle.run(ctx, scope)?;
                let right = right.run(ctx, scope)?;
                let call = Call::new(left, opts, scope);
                ops::ternary(*op, value, middle, right, ctx, &call)
            }
            Node::ByFunc {
                op,
                left,
                mapper,
                opts,
            } => {
                let value = left.run(ctx, scope)?;
                let mapper = mapper.run(ctx, scope)?;
                let call = Call::new(left, opts, scope);
                ops::by_func(*op, value, mapper, ctx, &call)
            }
            Node::OrderBy { left, keys } => {
                let value = left.run(ctx, scope)?;
                let mut selectors = Vec::with_capacity(keys.len());
                for key in keys {
                    selectors.push((Mapper::new(key.key.run(ctx, scope)?), key.direction));
                }
                fan_out(value, |seq| {
                    sequence::order_by(seq.into_sequence()?, &selectors, ctx, scope)
                })
            }
            Node::Branch { arms, otherwise } => {
                for (test, value) in arms {
                    if test.run(ctx, scope)?.is_truthy() {
                        return value.run(ctx, scope);
                    }
                }
                otherwise.run(ctx, scope)
            }
            Node::Default { left, fallback } => {
                let failure = match left.run(ctx, scope) {
                    Ok(Datum::Null) => Datum::Null,
                    Ok(value) => return Ok(value),
                    Err(ReqlError::NonExistence(msg)) => Datum::String(msg),
                    Err(e) => return Err(e),
                };
                match fallback.run(ctx, scope)? {
                    Datum::Func(func) => call(&func, vec![failure], ctx, scope),
                    value => Ok(value),
                }
            }
        }
    }
}

/// Operand context shared by operator implementations.
pub(crate) struct Call<'a> {
    /// Unevaluated primary operand, used for table-scope discovery.
    pub left: &'a Node,
    pub opts: &'a OptArgs,
    pub scope: &'a Scope,
}

impl<'a> Call<'a> {
    fn new(left: &'a Node, opts: &'a OptArgs, scope: &'a Scope) -> Self {
        Call { left, opts, scope }
    }

    /// Returns an option value, if set.
    pub fn opt(&self, key: &str) -> Option<&Datum> {
        self.opts.get(key)
    }

    /// Returns a string option or `default`.
    pub fn opt_str(&self, key: &str, default: &'a str) -> Result<&str> {
        match self.opts.get(key) {
            Some(value) => value.expect_str(),
            None => Ok(default),
        }
    }
}

/// Applies `op` to `value`, or to each group's value when `value` is grouped.
///
/// Group keys and their order are preserved.
///
/// # Errors
///
/// Returns the first error raised by `op`.
pub fn fan_out<F>(value: Datum, mut op: F) -> Result<Datum>
where
    F: FnMut(Datum) -> Result<Datum>,
{
    match value {
        Datum::Grouped(groups) => groups.try_map_values(&mut op).map(Datum::Grouped),
        other => op(other),
    }
}

/// Applies a function to an evaluated argument list.
///
/// The body runs in a child of `scope` binding each parameter positionally.
///
/// # Errors
///
/// Returns a runtime error on arity mismatch, or any error from the body.
pub fn call(func: &Func, args: Vec<Datum>, ctx: &mut RunContext, scope: &Scope) -> Result<Datum> {
    if args.len() != func.arity() {
        return Err(ReqlError::Runtime(format!(
            "Expected function with {} argument(s) but found function with {} argument(s).",
            args.len(),
            func.arity()
        )));
    }
    let frame = scope.push(func.params.iter().cloned().zip(args));
    func.body.run(ctx, &frame)
}

/// Applies a function to a single value.
///
/// An array is spread across the parameters when the function takes more
/// than one; otherwise the value is bound whole.
///
/// # Errors
///
/// See [`call`].
pub fn apply(func: &Func, value: Datum, ctx: &mut RunContext, scope: &Scope) -> Result<Datum> {
    match value {
        Datum::Array(items) if func.arity() > 1 => call(func, items, ctx, scope),
        single => call(func, vec![single], ctx, scope),
    }
}

/// An evaluated selector operand: the second operand of `map`, `filter`,
/// `order_by` and friends.
#[derive(Debug, Clone)]
pub(crate) enum Mapper {
    /// Applied to each element.
    Func(Arc<Func>),
    /// Selects a field.
    Field(String),
    /// Matches documents whose fields equal the given ones.
    Match(Object),
    /// Used as is.
    Constant(Datum),
}

impl Mapper {
    pub fn new(value: Datum) -> Self {
        match value {
            Datum::Func(func) => Mapper::Func(func),
            Datum::String(field) => Mapper::Field(field),
            other => Mapper::Constant(other),
        }
    }

    /// Like [`Mapper::new`], but objects become field-equality predicates.
    pub fn predicate(value: Datum) -> Self {
        match value {
            Datum::Object(fields) => Mapper::Match(fields),
            other => Mapper::new(other),
        }
    }

    /// Applies the selector to one element.
    ///
    /// A field selector raises `NonExistence` for documents lacking the field.
    pub fn apply(&self, item: &Datum, ctx: &mut RunContext, scope: &Scope) -> Result<Datum> {
        match self {
            Mapper::Func(func) => apply(func, item.clone(), ctx, scope),
            Mapper::Field(field) => item.get_field(field),
            Mapper::Match(fields) => Ok(Datum::Bool(
                fields.iter().all(|(k, v)| item.getter(k) == *v),
            )),
            Mapper::Constant(value) => Ok(value.clone()),
        }
    }

    /// Applies the selector, mapping `NonExistence` to `None`.
    pub fn apply_lenient(
        &self,
        item: &Datum,
        ctx: &mut RunContext,
        scope: &Scope,
    ) -> Result<Option<Datum>> {
        match self.apply(item, ctx, scope) {
            Ok(value) => Ok(Some(value)),
            Err(ReqlError::NonExistence(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ByFuncOp, UnaryOp};
    use crate::types::GroupResults;
    use serde_json::json;

    fn context() -> RunContext {
        RunContext::new(Arc::new(Catalog::new()), Utc::now(), None)
    }

    fn eval(node: &Node) -> Result<Datum> {
        node.run(&mut context(), &Scope::new())
    }

    #[test]
    fn test_fan_out_preserves_keys() {
        let groups: GroupResults = [
            (Datum::from("b"), Datum::from(json!([1, 2]))),
            (Datum::from("a"), Datum::from(json!([3]))),
        ]
        .into_iter()
        .collect();
        let out = fan_out(Datum::Grouped(groups), |seq| {
            Ok(Datum::from(seq.into_sequence()?.len() as u64))
        })
        .unwrap();
        let Datum::Grouped(out) = out else {
            panic!("expected grouped output");
        };
        let entries = out.into_entries();
        assert_eq!(entries[0], (Datum::from("b"), Datum::from(2)));
        assert_eq!(entries[1], (Datum::from("a"), Datum::from(1)));
    }

    #[test]
    fn test_function_arity_mismatch() {
        let func = Func::new(["a", "b"], Node::var("a"));
        let err = call(&func, vec![Datum::from(1)], &mut context(), &Scope::new()).unwrap_err();
        assert!(err.is_runtime());
    }

    #[test]
    fn test_single_param_binds_arrays_whole() {
        let func = Func::new(["x"], Node::unary(UnaryOp::Count, Node::var("x")));
        let out = apply(&func, Datum::from(json!([1, 2, 3])), &mut context(), &Scope::new());
        assert_eq!(out.unwrap(), Datum::from(3));
    }

    #[test]
    fn test_unbound_variable() {
        let err = eval(&Node::var("nope")).unwrap_err();
        assert_eq!(err, ReqlError::NameNotBound("nope".into()));
    }

    #[test]
    fn test_constructors_keep_functions() {
        let node = Node::object([("f", Node::func(["x"], Node::var("x")))]);
        let out = eval(&node).unwrap();
        assert!(matches!(out.getter("f"), Datum::Func(_)));
    }

    #[test]
    fn test_default_catches_missing_field() {
        let node = Node::default_to(
            Node::binary(BinaryOp::GetField, Node::json(json!({"a": 1})), Node::datum("b")),
            Node::datum("fallback"),
        );
        assert_eq!(eval(&node).unwrap(), Datum::from("fallback"));
    }

    #[test]
    fn test_default_does_not_catch_runtime_errors() {
        let node = Node::default_to(
            Node::unary(UnaryOp::Error, Node::datum("boom")),
            Node::datum("fallback"),
        );
        assert_eq!(eval(&node).unwrap_err(), ReqlError::runtime("boom"));
    }

    #[test]
    fn test_branch_is_lazy() {
        let node = Node::branch(
            vec![(Node::datum(true), Node::datum("yes"))],
            Node::unary(UnaryOp::Error, Node::datum("not evaluated")),
        );
        assert_eq!(eval(&node).unwrap(), Datum::from("yes"));
    }

    #[test]
    fn test_sibling_scopes_are_isolated() {
        // [1, 2].map(x => [3].map(y => x + y))
        let inner = Node::by_func(
            ByFuncOp::Map,
            Node::json(json!([3])),
            Node::func(["y"], Node::binary(BinaryOp::Add, Node::var("x"), Node::var("y"))),
        );
        let node = Node::by_func(ByFuncOp::Map, Node::json(json!([1, 2])), Node::func(["x"], inner));
        assert_eq!(eval(&node).unwrap(), Datum::from(json!([[4], [5]])));
    }
}
