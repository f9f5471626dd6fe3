//! Query assembly from guarded request directives.

use crate::dialect::Dialect;
use crate::directive::{DirectiveSet, SortDirective, relation_fields_key};
use crate::engine::{QueryEngine, QueryResult, SelectQuery};
use crate::error::{NameSet, QueryError};
use crate::filter::AllowedFilter;
use crate::guard;

/// Applies client directives to a query, one allow-list at a time.
///
/// Each declaration guards and applies its category immediately, so the
/// order of declaration calls is the order of validation, and a rejection
/// stops the chain at the `?`:
///
/// ```
/// use mik_query::{AllowedFilter, DirectiveSet, QueryConfig, QueryError};
///
/// # fn main() -> Result<(), QueryError> {
/// let directives = DirectiveSet::from_query_string(
///     "filter[title]=hello&sort=-created_at&include=author-profile&fields[posts]=id,title",
///     &QueryConfig::default(),
/// );
///
/// let result = mik_query::postgres("posts", Some(directives))
///     .allowed_filters([AllowedFilter::partial("title")])?
///     .allowed_sorts(["created_at", "title"])?
///     .allowed_includes(["authorProfile"])?
///     .build();
///
/// assert_eq!(
///     result.sql,
///     "SELECT id, title FROM posts WHERE title ILIKE $1 ORDER BY created_at DESC"
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QueryAssembler<Q: QueryEngine> {
    query: Q,
    directives: DirectiveSet,
    allowed_filters: Vec<AllowedFilter<Q>>,
    allowed_sorts: NameSet,
    allowed_includes: NameSet,
    default_sort: Option<SortDirective>,
}

impl<Q: QueryEngine> QueryAssembler<Q> {
    /// Start from a copy of `base`. The caller's query is left untouched.
    pub fn for_query(base: &Q, directives: Option<DirectiveSet>) -> Self {
        Self::new(base.clone(), directives)
    }

    /// Start from an owned query.
    ///
    /// Missing directives behave like a request with no parameters. If the
    /// client selected fields for the query's own table, the output columns
    /// are restricted right away.
    pub fn new(query: Q, directives: Option<DirectiveSet>) -> Self {
        let mut assembler = Self {
            query,
            directives: directives.unwrap_or_default(),
            allowed_filters: Vec::new(),
            allowed_sorts: NameSet::new(),
            allowed_includes: NameSet::new(),
            default_sort: None,
        };
        assembler.apply_root_fields();
        assembler
    }

    fn apply_root_fields(&mut self) {
        if let Some(columns) = self.directives.fields_for(self.query.table()) {
            tracing::debug!(table = self.query.table(), ?columns, "selecting requested fields");
            self.query.select(columns);
        }
    }

    /// Declare the filters the client may use, then apply the requested ones.
    ///
    /// Fails with [`QueryError::FilterNotAllowed`] before anything is applied
    /// if any requested filter is not declared. A declared built-in filter
    /// whose column is not a valid identifier fails with
    /// [`QueryError::Internal`], whatever the client sent.
    pub fn allowed_filters(
        mut self,
        filters: impl IntoIterator<Item = AllowedFilter<Q>>,
    ) -> Result<Self, QueryError> {
        self.allowed_filters = filters.into_iter().collect();

        if let Some(filter) = self.allowed_filters.iter().find(|f| !f.has_valid_column()) {
            tracing::error!(
                filter = filter.property(),
                column = filter.column(),
                "declared filter has no valid column"
            );
            return Err(QueryError::Internal(format!(
                "filter `{}` needs a valid column, alias it with `with_column`",
                filter.property()
            )));
        }

        let allowed: NameSet = self
            .allowed_filters
            .iter()
            .map(|f| f.property().to_string())
            .collect();
        guard::ensure_filters_allowed(&self.directives, &allowed)?;

        for (name, value) in self.directives.filters() {
            let Some(filter) = self.allowed_filters.iter().find(|f| f.is_for_property(name))
            else {
                tracing::error!(
                    filter = %name,
                    "allowed filter passed the guard but has no strategy"
                );
                return Err(QueryError::Internal(format!(
                    "no strategy found for allowed filter `{name}`"
                )));
            };
            filter.apply(&mut self.query, value);
        }

        tracing::debug!(
            table = self.query.table(),
            applied = self.directives.filters().len(),
            "applied filter directives"
        );
        Ok(self)
    }

    /// Sort by `key` (`-` prefix for descending) if the client sent no sorts.
    ///
    /// The default is trusted and not checked against the allowed sorts.
    pub fn default_sort(mut self, key: &str) -> Self {
        let Some(sort) = SortDirective::parse(key) else {
            tracing::warn!(sort = key, "ignoring malformed default sort");
            return self;
        };

        if self.directives.sorts().is_empty() {
            self.query.order_by(&sort.key, sort.dir());
            tracing::debug!(table = self.query.table(), sort = %sort.key, "applied default sort");
        }
        self.default_sort = Some(sort);
        self
    }

    /// Declare the sort keys the client may use, then apply the requested
    /// ones in request order.
    ///
    /// Does nothing when the client sent no sorts. An allowed `"*"` accepts
    /// every key. Fails with [`QueryError::SortNotAllowed`] otherwise.
    pub fn allowed_sorts<I, S>(mut self, sorts: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_sorts = sorts.into_iter().map(Into::into).collect();

        if self.directives.sorts().is_empty() {
            return Ok(self);
        }

        guard::ensure_sorts_allowed(&self.directives, &self.allowed_sorts)?;

        for sort in self.directives.sorts() {
            self.query.order_by(&sort.key, sort.dir());
        }

        tracing::debug!(
            table = self.query.table(),
            applied = self.directives.sorts().len(),
            "applied sort directives"
        );
        Ok(self)
    }

    /// Declare the relations the client may include, then eager-load the
    /// requested ones.
    ///
    /// Names are declared in canonical form (`authorProfile`). Field
    /// selections for a relation are read from `fields[author_profile]`.
    /// Fails with [`QueryError::IncludeNotAllowed`] if any requested relation
    /// is not declared.
    pub fn allowed_includes<I, S>(mut self, includes: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_includes = includes.into_iter().map(Into::into).collect();

        guard::ensure_includes_allowed(&self.directives, &self.allowed_includes)?;

        for relation in self.directives.includes() {
            let key = relation_fields_key(relation);
            let columns = self.directives.fields_for(&key);
            self.query.with_relation(relation, columns);
        }

        tracing::debug!(
            table = self.query.table(),
            applied = self.directives.includes().len(),
            "applied include directives"
        );
        Ok(self)
    }

    /// The directives being applied.
    pub const fn directives(&self) -> &DirectiveSet {
        &self.directives
    }

    /// The last declared filters.
    pub fn declared_filters(&self) -> &[AllowedFilter<Q>] {
        &self.allowed_filters
    }

    /// The last declared sort keys.
    pub const fn declared_sorts(&self) -> &NameSet {
        &self.allowed_sorts
    }

    /// The last declared includes.
    pub const fn declared_includes(&self) -> &NameSet {
        &self.allowed_includes
    }

    /// The declared default sort, if any.
    pub const fn declared_default_sort(&self) -> Option<&SortDirective> {
        self.default_sort.as_ref()
    }

    /// The query built so far.
    pub const fn query(&self) -> &Q {
        &self.query
    }

    /// Mutable access for caller-side additions that bypass the guard.
    pub const fn query_mut(&mut self) -> &mut Q {
        &mut self.query
    }

    /// Finish and take the query.
    pub fn into_query(self) -> Q {
        self.query
    }
}

impl<D: Dialect> QueryAssembler<SelectQuery<D>> {
    /// Render the assembled query.
    pub fn build(&self) -> QueryResult {
        self.query.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Postgres;
    use crate::engine::{Condition, EagerLoad, Operator, SortDir, SortField, Value};
    use crate::{QueryConfig, postgres};

    fn directives(query: &str) -> DirectiveSet {
        DirectiveSet::from_query_string(query, &QueryConfig::default())
    }

    #[test]
    fn test_no_directives_leaves_query_untouched() {
        let assembler = postgres("posts", None)
            .allowed_filters([AllowedFilter::exact("title")])
            .unwrap()
            .allowed_sorts(["title"])
            .unwrap()
            .allowed_includes(["author"])
            .unwrap();
        assert_eq!(assembler.build().sql, "SELECT * FROM posts");
    }

    #[test]
    fn test_root_fields_applied_on_construction() {
        let assembler = postgres("posts", Some(directives("fields[posts]=id,title")));
        assert_eq!(
            assembler.query().selected(),
            &["id".to_string(), "title".to_string()]
        );
    }

    #[test]
    fn test_root_fields_for_other_table_ignored() {
        let assembler = postgres("posts", Some(directives("fields[users]=id")));
        assert!(assembler.query().selected().is_empty());
    }

    #[test]
    fn test_for_query_clones_base() {
        let base = SelectQuery::new(Postgres, "posts")
            .filter("tenant_id", Operator::Eq, Value::Int(3))
            .with("author");

        let assembler = QueryAssembler::for_query(&base, Some(directives("sort=title")))
            .allowed_sorts(["title"])
            .unwrap();

        assert!(base.sorts().is_empty());
        let query = assembler.into_query();
        assert_eq!(query.conditions(), base.conditions());
        assert_eq!(query.relations(), &[EagerLoad::new("author")]);
        assert_eq!(query.sorts(), &[SortField::new("title", SortDir::Asc)]);
    }

    #[test]
    fn test_filter_rejection_applies_nothing() {
        let err = postgres("posts", Some(directives("filter[title]=a&filter[secret]=b")))
            .allowed_filters([AllowedFilter::exact("title")])
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::FilterNotAllowed {
                offending: ["secret".to_string()].into(),
                allowed: ["title".to_string()].into(),
            }
        );
    }

    #[test]
    fn test_invalid_filter_column_is_internal_error() {
        let err = postgres("posts", Some(directives("filter[is-active]=1")))
            .allowed_filters([AllowedFilter::exact("is-active")])
            .unwrap_err();
        assert!(matches!(err, QueryError::Internal(_)));
        assert_eq!(err.status_code(), 500);

        // Declaration error surfaces even when the client did not use the filter
        let err = postgres("posts", None)
            .allowed_filters([AllowedFilter::partial("is-active")])
            .unwrap_err();
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_aliased_dash_case_filter() {
        let assembler = postgres("posts", Some(directives("filter[is-active]=1")))
            .allowed_filters([AllowedFilter::exact("is-active").with_column("is_active")])
            .unwrap();
        assert_eq!(
            assembler.query().conditions(),
            &[Condition::compare("is_active", Operator::Eq, "1")]
        );
    }

    #[test]
    fn test_filters_applied_in_request_order() {
        let assembler = postgres("posts", Some(directives("filter[status]=draft&filter[title]=hi")))
            .allowed_filters([AllowedFilter::partial("title"), AllowedFilter::exact("status")])
            .unwrap();
        assert_eq!(
            assembler.query().conditions(),
            &[
                Condition::compare("status", Operator::Eq, "draft"),
                Condition::compare("title", Operator::ILike, "%hi%"),
            ]
        );
    }

    #[test]
    fn test_sorts_noop_without_client_sorts() {
        // Nothing requested, so even an empty allow-list cannot fail
        let assembler = postgres("posts", None)
            .allowed_sorts(Vec::<String>::new())
            .unwrap();
        assert!(assembler.query().sorts().is_empty());
        assert!(assembler.declared_sorts().is_empty());
    }

    #[test]
    fn test_default_sort_only_without_client_sorts() {
        let defaulted = postgres("posts", None)
            .default_sort("-created_at")
            .allowed_sorts(["title"])
            .unwrap();
        assert_eq!(
            defaulted.query().sorts(),
            &[SortField::new("created_at", SortDir::Desc)]
        );
        assert_eq!(
            defaulted.declared_default_sort().map(|s| s.key.as_str()),
            Some("created_at")
        );

        let explicit = postgres("posts", Some(directives("sort=title")))
            .default_sort("-created_at")
            .allowed_sorts(["title"])
            .unwrap();
        assert_eq!(explicit.query().sorts(), &[SortField::new("title", SortDir::Asc)]);
    }

    #[test]
    fn test_default_sort_bypasses_guard() {
        let assembler = postgres("posts", None)
            .default_sort("secret_rank")
            .allowed_sorts(["title"])
            .unwrap();
        assert_eq!(assembler.build().sql, "SELECT * FROM posts ORDER BY secret_rank ASC");
    }

    #[test]
    fn test_malformed_default_sort_ignored() {
        let assembler = postgres("posts", None).default_sort("-");
        assert!(assembler.query().sorts().is_empty());
        assert!(assembler.declared_default_sort().is_none());
    }

    #[test]
    fn test_includes_with_relation_fields() {
        let assembler = postgres(
            "posts",
            Some(directives(
                "include=author-profile,comments&fields[author_profile]=id,bio&fields[authorProfile]=x",
            )),
        )
        .allowed_includes(["authorProfile", "comments"])
        .unwrap();

        assert_eq!(
            assembler.query().relations(),
            &[
                EagerLoad::new("authorProfile").with_columns(vec!["id".into(), "bio".into()]),
                EagerLoad::new("comments"),
            ]
        );
    }

    #[test]
    fn test_include_rejection() {
        let err = postgres("posts", Some(directives("include=author,secrets")))
            .allowed_includes(["author"])
            .unwrap_err();
        assert_eq!(err.offending(), Some(&NameSet::from(["secrets".to_string()])));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_earlier_failure_short_circuits() {
        let result = postgres("posts", Some(directives("filter[secret]=x&sort=nope")))
            .allowed_filters([AllowedFilter::exact("title")])
            .and_then(|a| a.allowed_sorts(["title"]));
        assert!(matches!(result, Err(QueryError::FilterNotAllowed { .. })));
    }

    #[test]
    fn test_redeclaring_reapplies() {
        let assembler = postgres("posts", Some(directives("sort=title")))
            .allowed_sorts(["title"])
            .unwrap()
            .allowed_sorts(["title", "id"])
            .unwrap();
        assert_eq!(
            assembler.build().sql,
            "SELECT * FROM posts ORDER BY title ASC, title ASC"
        );
        assert_eq!(assembler.declared_sorts().len(), 2);
    }

    #[test]
    fn test_query_mut_bypasses_guard() {
        let mut assembler = postgres("posts", None);
        assembler
            .query_mut()
            .add_condition(Condition::compare("tenant_id", Operator::Eq, 9_i64));
        assert_eq!(assembler.build().sql, "SELECT * FROM posts WHERE tenant_id = $1");
    }
}
