//! Allowed filters and their strategies.
//!
//! Every filter a client may use is declared as an [`AllowedFilter`]: a
//! public property name bound to a [`FilterStrategy`].
//!
//! ```
//! use mik_query::{AllowedFilter, Condition, Operator, SelectQuery, Postgres, QueryEngine};
//!
//! let filters: Vec<AllowedFilter<SelectQuery<Postgres>>> = vec![
//!     AllowedFilter::exact("status"),
//!     AllowedFilter::partial("title"),
//!     AllowedFilter::exact("author").with_column("author_id"),
//!     AllowedFilter::custom("published", |query: &mut SelectQuery<Postgres>, value| {
//!         let published = value.as_text() == Some("true");
//!         query.add_condition(Condition::compare("published", Operator::Eq, published));
//!     }),
//! ];
//! assert!(filters[1].is_for_property("title"));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::directive::FilterValue;
use crate::engine::{Condition, Operator, QueryEngine, Value};
use crate::validate::{assert_valid_sql_identifier, is_valid_sql_identifier};

/// Caller-supplied filter logic.
pub type CustomFilter<Q> = Arc<dyn Fn(&mut Q, &FilterValue) + Send + Sync>;

/// How a filter value is applied to the query.
#[non_exhaustive]
pub enum FilterStrategy<Q> {
    /// `column = value`, or `column IN (...)` for a list.
    Exact,
    /// Case-insensitive `column LIKE %value%`, OR-combined for a list.
    Partial,
    /// Arbitrary logic supplied by the caller.
    Custom(CustomFilter<Q>),
}

impl<Q> Clone for FilterStrategy<Q> {
    fn clone(&self) -> Self {
        match self {
            Self::Exact => Self::Exact,
            Self::Partial => Self::Partial,
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<Q> fmt::Debug for FilterStrategy<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("Exact"),
            Self::Partial => f.write_str("Partial"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A filter the client is allowed to use.
pub struct AllowedFilter<Q> {
    property: String,
    column: Option<String>,
    strategy: FilterStrategy<Q>,
}

impl<Q> Clone for AllowedFilter<Q> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            column: self.column.clone(),
            strategy: self.strategy.clone(),
        }
    }
}

impl<Q> fmt::Debug for AllowedFilter<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowedFilter")
            .field("property", &self.property)
            .field("column", &self.column)
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl<Q: QueryEngine> AllowedFilter<Q> {
    /// Exact match on the column named like the property.
    pub fn exact(property: impl Into<String>) -> Self {
        Self::new(property, FilterStrategy::Exact)
    }

    /// Partial, case-insensitive match on the column named like the property.
    pub fn partial(property: impl Into<String>) -> Self {
        Self::new(property, FilterStrategy::Partial)
    }

    /// Custom filter logic.
    pub fn custom<F>(property: impl Into<String>, apply: F) -> Self
    where
        F: Fn(&mut Q, &FilterValue) + Send + Sync + 'static,
    {
        Self::new(property, FilterStrategy::Custom(Arc::new(apply)))
    }

    /// Allow a property with any strategy.
    pub fn new(property: impl Into<String>, strategy: FilterStrategy<Q>) -> Self {
        Self {
            property: property.into(),
            column: None,
            strategy,
        }
    }

    /// Apply built-in strategies to `column` instead of the property name.
    ///
    /// # Panics
    ///
    /// Panics if the column is not a valid SQL identifier.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        assert_valid_sql_identifier(&column, "filter column");
        self.column = Some(column);
        self
    }

    /// Public property name the client uses.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Column built-in strategies compare against.
    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.property)
    }

    /// The strategy bound to this property.
    pub const fn strategy(&self) -> &FilterStrategy<Q> {
        &self.strategy
    }

    /// Whether the strategy can be applied as declared.
    ///
    /// Built-in strategies write to [`column`](Self::column), which must be a
    /// plain SQL identifier. Declare `exact("is-active").with_column("is_active")`
    /// for property names that are not.
    pub fn has_valid_column(&self) -> bool {
        matches!(self.strategy, FilterStrategy::Custom(_)) || is_valid_sql_identifier(self.column())
    }

    /// Whether this filter handles the requested name.
    pub fn is_for_property(&self, name: &str) -> bool {
        self.property == name
    }

    /// Apply a client value to the query.
    pub fn apply(&self, query: &mut Q, value: &FilterValue) {
        match &self.strategy {
            FilterStrategy::Exact => apply_exact(query, self.column(), value),
            FilterStrategy::Partial => apply_partial(query, self.column(), value),
            FilterStrategy::Custom(apply) => apply(query, value),
        }
    }
}

fn apply_exact<Q: QueryEngine>(query: &mut Q, column: &str, value: &FilterValue) {
    match value {
        FilterValue::Text(text) => {
            query.add_condition(Condition::compare(column, Operator::Eq, text.as_str()));
        },
        FilterValue::List(_) => {
            let values: Vec<Value> = value.texts().into_iter().map(Value::from).collect();
            if values.is_empty() {
                return;
            }
            query.add_condition(Condition::compare(column, Operator::In, Value::Array(values)));
        },
        FilterValue::Map(_) => {
            tracing::debug!(column, "exact filter ignores keyed value");
        },
    }
}

fn apply_partial<Q: QueryEngine>(query: &mut Q, column: &str, value: &FilterValue) {
    if matches!(value, FilterValue::Map(_)) {
        tracing::debug!(column, "partial filter ignores keyed value");
        return;
    }

    let mut conditions: Vec<Condition> = value
        .texts()
        .into_iter()
        .filter(|text| !text.is_empty())
        .map(|text| Condition::compare(column, Operator::ILike, format!("%{text}%")))
        .collect();

    match conditions.len() {
        0 => {},
        1 => {
            if let Some(condition) = conditions.pop() {
                query.add_condition(condition);
            }
        },
        _ => query.add_condition(Condition::any(conditions)),
    }
}
