//! Placeholder and operator syntax per database.

use crate::engine::Value;

/// Database-specific rendering used by [`SelectQuery`](crate::SelectQuery).
pub trait Dialect: Clone + Copy {
    /// Placeholder for the `idx`-th bound parameter, 1-based.
    fn param(&self, idx: usize) -> String;

    /// Membership test of `field` against `values`, starting at placeholder
    /// `start_idx`. Returns the fragment and the parameters it binds.
    fn in_clause(&self, field: &str, values: &[Value], start_idx: usize) -> (String, Vec<Value>);

    /// Whether `ILIKE` exists. Without it, case-insensitive matching renders
    /// as plain `LIKE`.
    fn supports_ilike(&self) -> bool;
}

/// Postgres: `$1` placeholders, lists bound as one array parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    #[inline]
    fn param(&self, idx: usize) -> String {
        format!("${idx}")
    }

    fn in_clause(&self, field: &str, values: &[Value], start_idx: usize) -> (String, Vec<Value>) {
        let placeholder = self.param(start_idx);
        (
            format!("{field} = ANY({placeholder})"),
            vec![Value::Array(values.to_vec())],
        )
    }

    #[inline]
    fn supports_ilike(&self) -> bool {
        true
    }
}

/// `SQLite`: `?1` placeholders, one parameter per list item.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    #[inline]
    fn param(&self, idx: usize) -> String {
        format!("?{idx}")
    }

    fn in_clause(&self, field: &str, values: &[Value], start_idx: usize) -> (String, Vec<Value>) {
        let placeholders = (start_idx..start_idx + values.len())
            .map(|idx| self.param(idx))
            .collect::<Vec<_>>()
            .join(", ");
        (format!("{field} IN ({placeholders})"), values.to_vec())
    }

    #[inline]
    fn supports_ilike(&self) -> bool {
        // LIKE already ignores ASCII case
        false
    }
}
