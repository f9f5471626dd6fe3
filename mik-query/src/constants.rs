//! Centralized constants for the mik-query crate.
//!
//! Parameter names and the list delimiter are defaults for [`QueryConfig`];
//! the remaining values are fixed parts of the request format or hard limits.
//!
//! [`QueryConfig`]: crate::QueryConfig

// ============================================================================
// REQUEST FORMAT
// ============================================================================

/// Default name of the filter parameter (`filter[title]=hello`).
pub const DEFAULT_FILTER_PARAMETER: &str = "filter";

/// Default name of the sort parameter (`sort=-created_at,title`).
pub const DEFAULT_SORT_PARAMETER: &str = "sort";

/// Default name of the include parameter (`include=author-profile,comments`).
pub const DEFAULT_INCLUDE_PARAMETER: &str = "include";

/// Default name of the field selection parameter (`fields[posts]=id,title`).
pub const DEFAULT_FIELDS_PARAMETER: &str = "fields";

/// Default separator between list items in a single parameter value.
pub const DEFAULT_DELIMITER: char = ',';

/// Leading marker on a sort key that selects descending order.
pub const DESCENDING_MARKER: char = '-';

/// Allowed-sort entry that disables sort validation entirely.
pub const SORT_WILDCARD: &str = "*";

/// Separator between segments of a nested include (`posts.comments`).
pub const RELATION_SEPARATOR: char = '.';

// ============================================================================
// LIMITS
// ============================================================================

/// Maximum decoded length of a single query string key or value (64KB).
pub const MAX_DECODED_LEN: usize = 64 * 1024;

/// Maximum number of directives kept per category.
///
/// Anything beyond this is dropped during normalization.
pub const MAX_DIRECTIVES: usize = 64;

/// Maximum length for SQL identifiers (`PostgreSQL` limit is 63).
pub const MAX_IDENTIFIER_LENGTH: usize = 63;
