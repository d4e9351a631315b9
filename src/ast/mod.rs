//! Query program representation.
//!
//! A query is a tree of [`Node`]s handed to the engine by an external
//! query-construction layer. Each kind declares its operands explicitly;
//! [`Node::primary`] is the operand whose value drives group fan-out and
//! table-scope discovery.

mod ops;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use ops::{AdminOp, BinaryOp, ByFuncOp, TernaryOp, UnaryOp};

use crate::semantics::Direction;
use crate::types::Datum;

/// Optional arguments attached to a node (`index`, `conflict`, `left_bound`, ...).
pub type OptArgs = BTreeMap<String, Datum>;

/// A function value: formal parameter names plus an unevaluated body.
#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    /// Formal parameter names, bound positionally.
    pub params: Vec<String>,
    /// Body evaluated in a child scope holding the parameters.
    pub body: Node,
}

impl Func {
    /// Creates a function from parameter names and a body.
    #[must_use]
    pub fn new<S: Into<String>>(params: impl IntoIterator<Item = S>, body: Node) -> Self {
        Func {
            params: params.into_iter().map(Into::into).collect(),
            body,
        }
    }

    /// Creates `row => row(field)`, used for field-named indexes and selectors.
    #[must_use]
    pub fn field(field: &str) -> Self {
        Func::new(
            ["row"],
            Node::binary(BinaryOp::GetField, Node::var("row"), Node::datum(field)),
        )
    }

    /// Creates `row => [row(f1), row(f2), ...]` for compound indexes.
    #[must_use]
    pub fn fields<S: AsRef<str>>(fields: &[S]) -> Self {
        let parts = fields
            .iter()
            .map(|f| Node::binary(BinaryOp::GetField, Node::var("row"), Node::datum(f.as_ref())))
            .collect();
        Func::new(["row"], Node::MakeArray(parts))
    }

    /// Returns the number of formal parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<func({})>", self.params.join(", "))
    }
}

/// One `order_by` key: a field name, a function, or any selector node.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub key: Node,
    pub direction: Direction,
}

impl OrderKey {
    /// Ascending key.
    #[must_use]
    pub fn asc(key: Node) -> Self {
        OrderKey {
            key,
            direction: Direction::Asc,
        }
    }

    /// Descending key.
    #[must_use]
    pub fn desc(key: Node) -> Self {
        OrderKey {
            key,
            direction: Direction::Desc,
        }
    }
}

/// Table a mutation or index operation is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableScope<'a> {
    /// Database name, or `None` for the run's default database.
    pub db: Option<&'a str>,
    pub table: &'a str,
}

/// One instruction of a query program.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Constant value.
    Datum(Datum),
    /// Reference to a bound variable.
    Var(String),
    /// Function value.
    Func(Arc<Func>),
    /// Array constructor.
    MakeArray(Vec<Node>),
    /// Object constructor.
    MakeObject(Vec<(String, Node)>),
    /// The run's pinned "now".
    Now,
    /// All rows of a table.
    Table { db: Option<String>, name: String },
    /// Database and table administration.
    Admin(AdminOp),
    Unary {
        op: UnaryOp,
        left: Box<Node>,
        opts: OptArgs,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
        opts: OptArgs,
    },
    Ternary {
        op: TernaryOp,
        left: Box<Node>,
        middle: Box<Node>,
        right: Box<Node>,
        opts: OptArgs,
    },
    ByFunc {
        op: ByFuncOp,
        left: Box<Node>,
        mapper: Box<Node>,
        opts: OptArgs,
    },
    /// Multi-key stable sort.
    OrderBy { left: Box<Node>, keys: Vec<OrderKey> },
    /// Lazily evaluated `test, value, test, value, ..., otherwise`.
    Branch {
        arms: Vec<(Node, Node)>,
        otherwise: Box<Node>,
    },
    /// Evaluates `fallback` when `left` is missing or null.
    Default { left: Box<Node>, fallback: Box<Node> },
}

impl Node {
    /// Constant node.
    #[must_use]
    pub fn datum(value: impl Into<Datum>) -> Self {
        Node::Datum(value.into())
    }

    /// Constant node from JSON.
    #[must_use]
    pub fn json(value: serde_json::Value) -> Self {
        Node::Datum(Datum::from_json(&value))
    }

    /// Variable reference.
    #[must_use]
    pub fn var(name: &str) -> Self {
        Node::Var(name.to_string())
    }

    /// Function node.
    #[must_use]
    pub fn func<S: Into<String>>(params: impl IntoIterator<Item = S>, body: Node) -> Self {
        Node::Func(Arc::new(Func::new(params, body)))
    }

    /// Array constructor.
    #[must_use]
    pub fn array(items: Vec<Node>) -> Self {
        Node::MakeArray(items)
    }

    /// Object constructor.
    #[must_use]
    pub fn object<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Node)>) -> Self {
        Node::MakeObject(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Table in the run's default database.
    #[must_use]
    pub fn table(name: &str) -> Self {
        Node::Table {
            db: None,
            name: name.to_string(),
        }
    }

    /// Table in a named database.
    #[must_use]
    pub fn db_table(db: &str, name: &str) -> Self {
        Node::Table {
            db: Some(db.to_string()),
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn unary(op: UnaryOp, left: Node) -> Self {
        Node::Unary {
            op,
            left: Box::new(left),
            opts: OptArgs::new(),
        }
    }

    #[must_use]
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            opts: OptArgs::new(),
        }
    }

    #[must_use]
    pub fn ternary(op: TernaryOp, left: Node, middle: Node, right: Node) -> Self {
        Node::Ternary {
            op,
            left: Box::new(left),
            middle: Box::new(middle),
            right: Box::new(right),
            opts: OptArgs::new(),
        }
    }

    #[must_use]
    pub fn by_func(op: ByFuncOp, left: Node, mapper: Node) -> Self {
        Node::ByFunc {
            op,
            left: Box::new(left),
            mapper: Box::new(mapper),
            opts: OptArgs::new(),
        }
    }

    #[must_use]
    pub fn order_by(left: Node, keys: Vec<OrderKey>) -> Self {
        Node::OrderBy {
            left: Box::new(left),
            keys,
        }
    }

    #[must_use]
    pub fn branch(arms: Vec<(Node, Node)>, otherwise: Node) -> Self {
        Node::Branch {
            arms,
            otherwise: Box::new(otherwise),
        }
    }

    #[must_use]
    pub fn default_to(left: Node, fallback: Node) -> Self {
        Node::Default {
            left: Box::new(left),
            fallback: Box::new(fallback),
        }
    }

    #[must_use]
    pub fn admin(op: AdminOp) -> Self {
        Node::Admin(op)
    }

    /// Attaches an optional argument. Kinds without an options map ignore it.
    #[must_use]
    pub fn with_opt(mut self, key: &str, value: impl Into<Datum>) -> Self {
        if let Some(opts) = self.opts_mut() {
            opts.insert(key.to_string(), value.into());
        }
        self
    }

    fn opts_mut(&mut self) -> Option<&mut OptArgs> {
        match self {
            Node::Unary { opts, .. }
            | Node::Binary { opts, .. }
            | Node::Ternary { opts, .. }
            | Node::ByFunc { opts, .. } => Some(opts),
            _ => None,
        }
    }

    /// Returns the options map, if this kind has one.
    #[must_use]
    pub fn opts(&self) -> Option<&OptArgs> {
        match self {
            Node::Unary { opts, .. }
            | Node::Binary { opts, .. }
            | Node::Ternary { opts, .. }
            | Node::ByFunc { opts, .. } => Some(opts),
            _ => None,
        }
    }

    /// Returns the primary (left) operand.
    #[must_use]
    pub fn primary(&self) -> Option<&Node> {
        match self {
            Node::Unary { left, .. }
            | Node::Binary { left, .. }
            | Node::Ternary { left, .. }
            | Node::ByFunc { left, .. }
            | Node::OrderBy { left, .. }
            | Node::Default { left, .. } => Some(left),
            _ => None,
        }
    }

    /// Returns every direct operand in evaluation order.
    #[must_use]
    pub fn operands(&self) -> Vec<&Node> {
        match self {
            Node::Datum(_)
            | Node::Var(_)
            | Node::Now
            | Node::Table { .. }
            | Node::Admin(_) => Vec::new(),
            Node::Func(func) => vec![&func.body],
            Node::MakeArray(items) => items.iter().collect(),
            Node::MakeObject(pairs) => pairs.iter().map(|(_, v)| v).collect(),
            Node::Unary { left, .. } => vec![left],
            Node::Binary { left, right, .. } => vec![left, right],
            Node::Ternary {
                left,
                middle,
                right,
                ..
            } => vec![left, middle, right],
            Node::ByFunc { left, mapper, .. } => vec![left, mapper],
            Node::OrderBy { left, keys } => {
                let mut out: Vec<&Node> = vec![left];
                out.extend(keys.iter().map(|k| &k.key));
                out
            }
            Node::Branch { arms, otherwise } => {
                let mut out: Vec<&Node> = arms.iter().flat_map(|(t, v)| [t, v]).collect();
                out.push(otherwise);
                out
            }
            Node::Default { left, fallback } => vec![left, fallback],
        }
    }

    /// Finds the table this node ultimately reads from, walking primary operands.
    #[must_use]
    pub fn find_table_scope(&self) -> Option<TableScope<'_>> {
        match self {
            Node::Table { db, name } => Some(TableScope {
                db: db.as_deref(),
                table: name,
            }),
            other => other.primary().and_then(Node::find_table_scope),
        }
    }

    /// Returns the kind's name for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Datum(_) => "datum",
            Node::Var(_) => "var",
            Node::Func(_) => "func",
            Node::MakeArray(_) => "make_array",
            Node::MakeObject(_) => "make_obj",
            Node::Now => "now",
            Node::Table { .. } => "table",
            Node::Admin(_) => "admin",
            Node::Unary { op, .. } => op.name(),
            Node::Binary { op, .. } => op.name(),
            Node::Ternary { op, .. } => op.name(),
            Node::ByFunc { op, .. } => op.name(),
            Node::OrderBy { .. } => "order_by",
            Node::Branch { .. } => "branch",
            Node::Default { .. } => "default",
        }
    }
}
