//! SELECT query engine.

use super::QueryEngine;
use super::condition::build_condition_impl;
use super::types::{Condition, EagerLoad, Operator, QueryResult, SortDir, SortField, Value};
use crate::dialect::Dialect;
use crate::validate::assert_valid_sql_identifier;

/// SQL SELECT builder with dialect support.
///
/// Eager loads are recorded but not rendered: loading relations is left to
/// whatever executes the query.
#[derive(Debug, Clone)]
pub struct SelectQuery<D: Dialect> {
    dialect: D,
    table: String,
    columns: Vec<String>,
    conditions: Vec<Condition>,
    sorts: Vec<SortField>,
    relations: Vec<EagerLoad>,
}

impl<D: Dialect> SelectQuery<D> {
    /// Create a new query for the given table.
    ///
    /// # Panics
    ///
    /// Panics if the table name is not a valid SQL identifier.
    pub fn new(dialect: D, table: impl Into<String>) -> Self {
        let table = table.into();
        assert_valid_sql_identifier(&table, "table");
        Self {
            dialect,
            table,
            columns: Vec::new(),
            conditions: Vec::new(),
            sorts: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Set the columns to SELECT.
    ///
    /// # Panics
    ///
    /// Panics if any column name is not a valid SQL identifier.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        let owned: Vec<String> = columns.iter().map(|s| (*s).to_string()).collect();
        self.select(&owned);
        self
    }

    /// Add a scope condition.
    ///
    /// # Panics
    ///
    /// Panics if the column name is not a valid SQL identifier.
    pub fn filter(mut self, column: impl Into<String>, op: Operator, value: Value) -> Self {
        self.add_condition(Condition::compare(column, op, value));
        self
    }

    /// Add a sort field.
    ///
    /// # Panics
    ///
    /// Panics if the column name is not a valid SQL identifier.
    pub fn sort(mut self, column: &str, dir: SortDir) -> Self {
        self.order_by(column, dir);
        self
    }

    /// Eager-load a relation by default.
    pub fn with(mut self, relation: &str) -> Self {
        self.with_relation(relation, None);
        self
    }

    /// Selected columns, empty means `*`.
    pub fn selected(&self) -> &[String] {
        &self.columns
    }

    /// WHERE conditions, AND-combined.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// ORDER BY terms in clause order.
    pub fn sorts(&self) -> &[SortField] {
        &self.sorts
    }

    /// Relations to eager-load.
    pub fn relations(&self) -> &[EagerLoad] {
        &self.relations
    }

    /// Build the SQL query and parameters.
    pub fn build(&self) -> QueryResult {
        let mut params = Vec::new();
        let mut param_idx = 1usize;

        let select_str = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", select_str, self.table);

        if !self.conditions.is_empty() {
            let mut parts = Vec::with_capacity(self.conditions.len());
            for condition in &self.conditions {
                let (part, new_params, new_idx) =
                    build_condition_impl(&self.dialect, condition, param_idx);
                parts.push(part);
                params.extend(new_params);
                param_idx = new_idx;
            }
            sql.push_str(" WHERE ");
            sql.push_str(&parts.join(" AND "));
        }

        if !self.sorts.is_empty() {
            let sort_parts: Vec<String> = self
                .sorts
                .iter()
                .map(|s| {
                    let dir = match s.dir {
                        SortDir::Asc => "ASC",
                        SortDir::Desc => "DESC",
                    };
                    format!("{} {}", s.field, dir)
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&sort_parts.join(", "));
        }

        QueryResult { sql, params }
    }
}

impl<D: Dialect> QueryEngine for SelectQuery<D> {
    fn table(&self) -> &str {
        &self.table
    }

    fn select(&mut self, columns: &[String]) {
        for column in columns {
            assert_valid_sql_identifier(column, "select column");
        }
        self.columns = columns.to_vec();
    }

    fn order_by(&mut self, column: &str, dir: SortDir) {
        assert_valid_sql_identifier(column, "sort column");
        self.sorts.push(SortField::new(column, dir));
    }

    fn with_relation(&mut self, relation: &str, columns: Option<&[String]>) {
        let mut load = EagerLoad::new(relation);
        if let Some(columns) = columns {
            for column in columns {
                assert_valid_sql_identifier(column, "relation column");
            }
            load = load.with_columns(columns.to_vec());
        }
        self.relations.push(load);
    }

    fn add_condition(&mut self, condition: Condition) {
        for column in condition.columns() {
            assert_valid_sql_identifier(column, "filter column");
        }
        self.conditions.push(condition);
    }
}
