// =============================================================================
// CRATE-LEVEL QUALITY LINTS (following Tokio/Serde standards)
// =============================================================================
#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
// =============================================================================
// CLIPPY CONFIGURATION
// =============================================================================
#![allow(clippy::doc_markdown)] // Code items in docs - extensive doc changes needed
#![allow(clippy::missing_errors_doc)] // # Errors sections - doc-heavy
#![allow(clippy::missing_panics_doc)] // # Panics sections - doc-heavy
#![allow(clippy::module_name_repetitions)] // Type names matching module - acceptable
#![allow(clippy::return_self_not_must_use)] // Builder pattern methods return Self
#![allow(clippy::must_use_candidate)] // Builder methods - fluent API doesn't need must_use

//! # mik-query - Allow-listed Query Directives
//!
//! Turns the filter, sort, include and field parameters of an HTTP request
//! into query operations, but only the ones the endpoint declared.
//!
//! ## Quick Start
//!
//! ```
//! # use mik_query::prelude::*;
//! # fn main() -> Result<(), QueryError> {
//! let directives = DirectiveSet::from_query_string(
//!     "/posts?filter[status]=published&filter[title]=rust&sort=-created_at",
//!     &QueryConfig::default(),
//! );
//!
//! let result = postgres("posts", Some(directives))
//!     .allowed_filters([AllowedFilter::exact("status"), AllowedFilter::partial("title")])?
//!     .default_sort("-id")
//!     .allowed_sorts(["created_at", "id"])?
//!     .build();
//!
//! assert_eq!(
//!     result.sql,
//!     "SELECT * FROM posts WHERE status = $1 AND title ILIKE $2 ORDER BY created_at DESC"
//! );
//! assert_eq!(result.params, vec![Value::from("published"), Value::from("%rust%")]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Rejections
//!
//! Anything the client asks for that was not declared fails the whole
//! request. The error lists every offending name at once:
//!
//! ```
//! # use mik_query::prelude::*;
//! let directives = DirectiveSet::from_query_string(
//!     "filter[password]=x&filter[email]=y",
//!     &QueryConfig::default(),
//! );
//!
//! let err = sqlite("users", Some(directives))
//!     .allowed_filters([AllowedFilter::exact("name")])
//!     .unwrap_err();
//!
//! assert_eq!(err.status_code(), 400);
//! assert_eq!(
//!     err.to_string(),
//!     "requested filter(s) `email, password` are not allowed, allowed filter(s) are `name`"
//! );
//! ```
//!
//! ## Request Conventions
//!
//! | Parameter | Example | Meaning |
//! |-----------|---------|---------|
//! | `filter[name]` | `filter[status]=draft` | Filter by a declared property |
//! | `filter[name][]` | `filter[id][]=1&filter[id][]=2` | List value |
//! | `sort` | `sort=-created_at,title` | `-` marks descending |
//! | `include` | `include=author-profile` | Eager-load, matched as `authorProfile` |
//! | `fields[key]` | `fields[posts]=id,title` | Columns for the table or a relation |
//!
//! Field selections for an included relation use the snake_case key, so
//! `include=authorProfile` reads `fields[author_profile]`.

mod assembler;
mod config;
pub mod constants;
mod dialect;
mod directive;
mod engine;
mod error;
mod filter;
pub mod guard;
mod validate;

pub use assembler::QueryAssembler;
pub use config::{ParameterNames, QueryConfig};
pub use dialect::{Dialect, Postgres, Sqlite};
pub use directive::{
    DirectiveSet, DirectiveSource, FilterValue, QueryParams, SortDirective, canonical_relation,
    relation_fields_key,
};
pub use engine::{
    Condition, EagerLoad, Operator, QueryEngine, QueryResult, SelectQuery, SortDir, SortField,
    Value,
};
pub use error::{ConfigError, DecodeError, NameSet, QueryError};
pub use filter::{AllowedFilter, CustomFilter, FilterStrategy};
pub use validate::{assert_valid_sql_identifier, is_valid_sql_identifier};

/// Assemble a Postgres query for `table`.
///
/// # Panics
///
/// Panics if `table` is not a valid SQL identifier.
#[must_use]
pub fn postgres(
    table: &str,
    directives: Option<DirectiveSet>,
) -> QueryAssembler<SelectQuery<Postgres>> {
    QueryAssembler::new(SelectQuery::new(Postgres, table), directives)
}

/// Assemble a `SQLite` query for `table`.
///
/// # Panics
///
/// Panics if `table` is not a valid SQL identifier.
#[must_use]
pub fn sqlite(
    table: &str,
    directives: Option<DirectiveSet>,
) -> QueryAssembler<SelectQuery<Sqlite>> {
    QueryAssembler::new(SelectQuery::new(Sqlite, table), directives)
}

/// Prelude module for convenient imports.
///
/// ```
/// use mik_query::prelude::*;
/// let result = postgres("users", None).build();
/// assert_eq!(result.sql, "SELECT * FROM users");
/// ```
pub mod prelude {
    pub use crate::{
        AllowedFilter, Condition, Dialect, DirectiveSet, DirectiveSource, FilterStrategy,
        FilterValue, Operator, Postgres, QueryAssembler, QueryConfig, QueryEngine, QueryError,
        QueryParams, QueryResult, SelectQuery, SortDir, Sqlite, Value, postgres, sqlite,
    };
}
