//! Allow-list guard.
//!
//! Each check computes `requested − allowed` for one directive category and
//! fails with the full difference. Nothing is applied to the query unless
//! the check passes, so a request is either accepted whole or rejected.

use crate::constants::SORT_WILDCARD;
use crate::directive::{DirectiveSet, relation_prefixes};
use crate::error::{NameSet, QueryError};

/// Names in `requested` that are not in `allowed`.
pub fn disallowed<'a, I>(requested: I, allowed: &NameSet) -> NameSet
where
    I: IntoIterator<Item = &'a str>,
{
    requested
        .into_iter()
        .filter(|name| !allowed.contains(*name))
        .map(str::to_string)
        .collect()
}

/// Every requested filter name must be allowed.
pub fn ensure_filters_allowed(
    directives: &DirectiveSet,
    allowed: &NameSet,
) -> Result<(), QueryError> {
    let requested = directives.filters().iter().map(|(name, _)| name.as_str());
    let offending = disallowed(requested, allowed);
    if offending.is_empty() {
        return Ok(());
    }

    tracing::debug!(?offending, "rejected filter directives");
    Err(QueryError::FilterNotAllowed {
        offending,
        allowed: allowed.clone(),
    })
}

/// Every requested sort key must be allowed, unless the wildcard is.
pub fn ensure_sorts_allowed(
    directives: &DirectiveSet,
    allowed: &NameSet,
) -> Result<(), QueryError> {
    if allowed.contains(SORT_WILDCARD) {
        return Ok(());
    }

    let requested = directives.sorts().iter().map(|sort| sort.key.as_str());
    let offending = disallowed(requested, allowed);
    if offending.is_empty() {
        return Ok(());
    }

    tracing::debug!(?offending, "rejected sort directives");
    Err(QueryError::SortNotAllowed {
        offending,
        allowed: allowed.clone(),
    })
}

/// Every requested include must be allowed. An allowed nested include also
/// allows each of its prefixes.
pub fn ensure_includes_allowed(
    directives: &DirectiveSet,
    allowed: &NameSet,
) -> Result<(), QueryError> {
    let expanded = expand_includes(allowed);
    let requested = directives.includes().iter().map(String::as_str);
    let offending = disallowed(requested, &expanded);
    if offending.is_empty() {
        return Ok(());
    }

    tracing::debug!(?offending, "rejected include directives");
    Err(QueryError::IncludeNotAllowed {
        offending,
        allowed: expanded,
    })
}

/// `posts.comments` expands to `posts` and `posts.comments`.
pub(crate) fn expand_includes(allowed: &NameSet) -> NameSet {
    allowed
        .iter()
        .flat_map(|include| relation_prefixes(include))
        .map(str::to_string)
        .collect()
}
