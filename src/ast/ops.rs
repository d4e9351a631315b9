//! Operator tags for each node arity.

/// Operators taking a single (primary) operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    IsEmpty,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Distinct,
    Keys,
    Values,
    Ceil,
    Floor,
    Round,
    TypeOf,
    /// Parses a JSON string into a datum.
    Json,
    /// Wraps the operand as a merge-time literal.
    Literal,
    /// Raises a runtime error carrying the operand as message.
    Error,
    /// Converts grouped data to `[{group, reduction}]`.
    Ungroup,
    Sync,
    Delete,
    IndexList,
    IndexWait,
}

/// Operators taking a primary operand and one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    /// `value[x]`: field access for strings, element access for numbers.
    Bracket,
    GetField,
    Nth,
    HasFields,
    Pluck,
    Without,
    Merge,
    Append,
    Prepend,
    Contains,
    SetInsert,
    SetUnion,
    SetIntersection,
    SetDifference,
    Limit,
    Skip,
    Union,
    CoerceTo,
    DeleteAt,
    Get,
    GetAll,
    Insert,
    Update,
    Replace,
    IndexDrop,
}

/// Operators taking a primary operand and two arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TernaryOp {
    Between,
    Slice,
    InsertAt,
    SpliceAt,
    ChangeAt,
    IndexCreate,
    IndexRename,
}

/// "Apply left, then map": the second operand is applied per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByFuncOp {
    Map,
    Filter,
    ConcatMap,
    Reduce,
    ForEach,
    Group,
    MinBy,
    MaxBy,
    SumBy,
    AvgBy,
    /// Applies the function to the left value itself, not to its elements.
    Do,
}

/// Catalog-level operations that need no primary operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AdminOp {
    DbCreate(String),
    DbDrop(String),
    DbList,
    TableCreate { db: Option<String>, name: String },
    TableDrop { db: Option<String>, name: String },
    TableList { db: Option<String> },
}

impl UnaryOp {
    /// Returns the query-language name of the operator.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::IsEmpty => "is_empty",
            UnaryOp::Count => "count",
            UnaryOp::Sum => "sum",
            UnaryOp::Avg => "avg",
            UnaryOp::Min => "min",
            UnaryOp::Max => "max",
            UnaryOp::Distinct => "distinct",
            UnaryOp::Keys => "keys",
            UnaryOp::Values => "values",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Floor => "floor",
            UnaryOp::Round => "round",
            UnaryOp::TypeOf => "type_of",
            UnaryOp::Json => "json",
            UnaryOp::Literal => "literal",
            UnaryOp::Error => "error",
            UnaryOp::Ungroup => "ungroup",
            UnaryOp::Sync => "sync",
            UnaryOp::Delete => "delete",
            UnaryOp::IndexList => "index_list",
            UnaryOp::IndexWait => "index_wait",
        }
    }
}

impl BinaryOp {
    /// Returns the query-language name of the operator.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Bracket => "bracket",
            BinaryOp::GetField => "get_field",
            BinaryOp::Nth => "nth",
            BinaryOp::HasFields => "has_fields",
            BinaryOp::Pluck => "pluck",
            BinaryOp::Without => "without",
            BinaryOp::Merge => "merge",
            BinaryOp::Append => "append",
            BinaryOp::Prepend => "prepend",
            BinaryOp::Contains => "contains",
            BinaryOp::SetInsert => "set_insert",
            BinaryOp::SetUnion => "set_union",
            BinaryOp::SetIntersection => "set_intersection",
            BinaryOp::SetDifference => "set_difference",
            BinaryOp::Limit => "limit",
            BinaryOp::Skip => "skip",
            BinaryOp::Union => "union",
            BinaryOp::CoerceTo => "coerce_to",
            BinaryOp::DeleteAt => "delete_at",
            BinaryOp::Get => "get",
            BinaryOp::GetAll => "get_all",
            BinaryOp::Insert => "insert",
            BinaryOp::Update => "update",
            BinaryOp::Replace => "replace",
            BinaryOp::IndexDrop => "index_drop",
        }
    }
}

impl TernaryOp {
    /// Returns the query-language name of the operator.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TernaryOp::Between => "between",
            TernaryOp::Slice => "slice",
            TernaryOp::InsertAt => "insert_at",
            TernaryOp::SpliceAt => "splice_at",
            TernaryOp::ChangeAt => "change_at",
            TernaryOp::IndexCreate => "index_create",
            TernaryOp::IndexRename => "index_rename",
        }
    }
}

impl ByFuncOp {
    /// Returns the query-language name of the operator.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ByFuncOp::Map => "map",
            ByFuncOp::Filter => "filter",
            ByFuncOp::ConcatMap => "concat_map",
            ByFuncOp::Reduce => "reduce",
            ByFuncOp::ForEach => "for_each",
            ByFuncOp::Group => "group",
            ByFuncOp::MinBy => "min",
            ByFuncOp::MaxBy => "max",
            ByFuncOp::SumBy => "sum",
            ByFuncOp::AvgBy => "avg",
            ByFuncOp::Do => "do",
        }
    }
}
