//! Core types shared by query engines.

/// SQL comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal: `=`
    Eq,
    /// Not equal: `!=`
    Ne,
    /// Greater than: `>`
    Gt,
    /// Greater than or equal: `>=`
    Gte,
    /// Less than: `<`
    Lt,
    /// Less than or equal: `<=`
    Lte,
    /// In array: `IN` or `= ANY`
    In,
    /// Pattern match: `LIKE`
    Like,
    /// Case-insensitive pattern match: `ILIKE` (Postgres) or `LIKE` (`SQLite`)
    ILike,
}

/// SQL parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A WHERE condition added to a query.
///
/// Top-level conditions on a query are AND-combined.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single column comparison.
    Compare {
        /// Column name.
        column: String,
        /// Comparison operator.
        op: Operator,
        /// Bound parameter value.
        value: Value,
    },
    /// Matches when at least one inner condition matches.
    Any(Vec<Condition>),
}

impl Condition {
    /// Create a column comparison.
    pub fn compare(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Create an OR group.
    #[must_use]
    pub const fn any(conditions: Vec<Self>) -> Self {
        Self::Any(conditions)
    }

    /// Every column referenced by this condition.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Compare { column, .. } => vec![column.as_str()],
            Self::Any(inner) => inner.iter().flat_map(Self::columns).collect(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Sort field with direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub dir: SortDir,
}

impl SortField {
    /// Create a new sort field.
    pub fn new(field: impl Into<String>, dir: SortDir) -> Self {
        Self {
            field: field.into(),
            dir,
        }
    }
}

/// A relation to eager-load alongside the main rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EagerLoad {
    /// Canonical relation name (`authorProfile`, `posts.comments`).
    pub relation: String,
    /// Column restriction, `None` loads the relation's default columns.
    pub columns: Option<Vec<String>>,
}

impl EagerLoad {
    /// Eager-load a relation with its default columns.
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            columns: None,
        }
    }

    /// Restrict the relation to the given columns.
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }
}

/// Query result with SQL string and parameters.
#[derive(Debug)]
#[must_use = "QueryResult must be used to execute the query"]
pub struct QueryResult {
    pub sql: String,
    pub params: Vec<Value>,
}
