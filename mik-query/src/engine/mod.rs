//! The query engine seam.
//!
//! [`QueryAssembler`](crate::QueryAssembler) never renders or executes SQL
//! itself. It drives any type implementing [`QueryEngine`]; [`SelectQuery`]
//! is the bundled implementation that renders parameterized SQL.

mod condition;
mod select;
mod types;

pub use select::SelectQuery;
pub use types::{Condition, EagerLoad, Operator, QueryResult, SortDir, SortField, Value};

/// Operations the assembler needs from an underlying query object.
///
/// `Clone` is the copy constructor: a clone must carry the table binding,
/// any default eager loads and any scope conditions already on the query.
pub trait QueryEngine: Clone {
    /// Table (or collection) the query is bound to.
    fn table(&self) -> &str;

    /// Restrict the output columns.
    fn select(&mut self, columns: &[String]);

    /// Append an ORDER BY term.
    fn order_by(&mut self, column: &str, dir: SortDir);

    /// Eager-load a relation, optionally restricted to `columns`.
    fn with_relation(&mut self, relation: &str, columns: Option<&[String]>);

    /// AND a condition onto the WHERE clause.
    fn add_condition(&mut self, condition: Condition);
}
