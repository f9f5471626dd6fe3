//! SQL identifier validation.
//!
//! Client-supplied column and sort names are dropped during normalization
//! unless they pass [`is_valid_sql_identifier`]. Caller-supplied names (table,
//! filter properties) are asserted instead, since a bad one is a programming
//! error.

use crate::constants::MAX_IDENTIFIER_LENGTH;

/// Validate that a string is a safe SQL identifier.
///
/// A valid SQL identifier:
/// - Starts with a letter (a-z, A-Z) or underscore
/// - Contains only letters, digits (0-9), and underscores
/// - Is not empty and not longer than 63 characters
///
/// # Examples
///
/// ```
/// use mik_query::is_valid_sql_identifier;
///
/// assert!(is_valid_sql_identifier("created_at"));
/// assert!(is_valid_sql_identifier("_private"));
///
/// assert!(!is_valid_sql_identifier(""));
/// assert!(!is_valid_sql_identifier("1st"));
/// assert!(!is_valid_sql_identifier("name; DROP TABLE posts"));
/// ```
#[inline]
#[must_use]
pub fn is_valid_sql_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_IDENTIFIER_LENGTH {
        return false;
    }

    let mut chars = s.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Assert that a caller-supplied string is a valid SQL identifier.
///
/// # Panics
///
/// Panics with a descriptive error if the identifier is invalid. Only use this
/// for names that come from code, never for request input.
///
/// ```should_panic
/// use mik_query::assert_valid_sql_identifier;
///
/// assert_valid_sql_identifier("posts; --", "table");
/// ```
#[inline]
pub fn assert_valid_sql_identifier(s: &str, context: &str) {
    assert!(
        is_valid_sql_identifier(s),
        "Invalid SQL {context} name '{s}': must start with letter/underscore, \
             contain only ASCII alphanumeric/underscore, and be 1-63 chars"
    );
}
