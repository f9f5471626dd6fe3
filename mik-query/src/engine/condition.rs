//! WHERE condition rendering.

use super::types::{Condition, Operator, Value};
use crate::dialect::Dialect;

/// Render a condition, returning SQL, bound params and the next param index.
pub(super) fn build_condition_impl<D: Dialect>(
    dialect: &D,
    condition: &Condition,
    start_idx: usize,
) -> (String, Vec<Value>, usize) {
    match condition {
        Condition::Compare { column, op, value } => {
            build_compare_impl(dialect, column, *op, value, start_idx)
        },
        Condition::Any(inner) => build_any_impl(dialect, inner, start_idx),
    }
}

fn build_any_impl<D: Dialect>(
    dialect: &D,
    inner: &[Condition],
    start_idx: usize,
) -> (String, Vec<Value>, usize) {
    let mut idx = start_idx;
    let mut all_params = Vec::new();
    let mut parts = Vec::with_capacity(inner.len());

    for condition in inner {
        let (sql, params, new_idx) = build_condition_impl(dialect, condition, idx);
        parts.push(sql);
        all_params.extend(params);
        idx = new_idx;
    }

    let sql = match parts.len() {
        // An empty OR group matches nothing
        0 => "1=0".to_string(),
        1 => parts.concat(),
        _ => format!("({})", parts.join(" OR ")),
    };

    (sql, all_params, idx)
}

fn build_compare_impl<D: Dialect>(
    dialect: &D,
    column: &str,
    op: Operator,
    value: &Value,
    idx: usize,
) -> (String, Vec<Value>, usize) {
    match (op, value) {
        (Operator::Eq, Value::Null) => (format!("{column} IS NULL"), Vec::new(), idx),
        (Operator::Ne, Value::Null) => (format!("{column} IS NOT NULL"), Vec::new(), idx),
        (Operator::In, Value::Array(values)) if values.is_empty() => {
            ("1=0".to_string(), Vec::new(), idx)
        },
        (Operator::In, Value::Array(values)) => {
            let (sql, params) = dialect.in_clause(column, values, idx);
            let next_idx = idx + params.len();
            (sql, params, next_idx)
        },
        _ => {
            let sql = format!("{column} {} {}", operator_sql(dialect, op), dialect.param(idx));
            (sql, vec![value.clone()], idx + 1)
        },
    }
}

fn operator_sql<D: Dialect>(dialect: &D, op: Operator) -> &'static str {
    match op {
        // IN with a scalar degrades to equality
        Operator::Eq | Operator::In => "=",
        Operator::Ne => "!=",
        Operator::Gt => ">",
        Operator::Gte => ">=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
        Operator::Like => "LIKE",
        Operator::ILike if dialect.supports_ilike() => "ILIKE",
        Operator::ILike => "LIKE",
    }
}
