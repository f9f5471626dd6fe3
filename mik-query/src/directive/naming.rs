//! Relation naming conventions.
//!
//! Relation names take a different form depending on where they appear:
//!
//! | Where                        | Convention        | Example          |
//! |------------------------------|-------------------|------------------|
//! | `include` in the request     | any (dash-case)   | `author-profile` |
//! | canonical relation / allowed | camelCase         | `authorProfile`  |
//! | `fields[...]` for a relation | snake_case        | `author_profile` |
//! | `fields[...]` for the root   | literal table     | `posts`          |

use convert_case::{Boundary, Case, Converter};

use crate::constants::RELATION_SEPARATOR;

/// Word breaks inside a relation segment.
///
/// A digit only ends a word when an uppercase letter follows it, so
/// `address2` stays one word and `line2Item` splits as `line2` + `Item`.
const WORD_BOUNDARIES: [Boundary; 6] = [
    Boundary::Hyphen,
    Boundary::Underscore,
    Boundary::Space,
    Boundary::LowerUpper,
    Boundary::DigitUpper,
    Boundary::Acronym,
];

/// Convert a requested include to its canonical relation name.
///
/// Each dotted segment is camelCased. Returns `None` when any segment is
/// empty, so `posts..comments` is treated as absent.
///
/// ```
/// use mik_query::canonical_relation;
///
/// assert_eq!(canonical_relation("author-profile").as_deref(), Some("authorProfile"));
/// assert_eq!(canonical_relation("posts.latest-comment").as_deref(), Some("posts.latestComment"));
/// assert_eq!(canonical_relation("posts..comments"), None);
/// ```
pub fn canonical_relation(raw: &str) -> Option<String> {
    let camel = Converter::new()
        .set_boundaries(&WORD_BOUNDARIES)
        .to_case(Case::Camel);
    convert_segments(raw.trim(), |segment| camel.convert(segment))
}

/// Key under which field selections for a canonical relation are looked up.
///
/// ```
/// use mik_query::relation_fields_key;
///
/// assert_eq!(relation_fields_key("authorProfile"), "author_profile");
/// assert_eq!(relation_fields_key("posts.latestComment"), "posts.latest_comment");
/// ```
pub fn relation_fields_key(canonical: &str) -> String {
    let snake = Converter::new()
        .set_boundaries(&WORD_BOUNDARIES)
        .to_case(Case::Snake);
    convert_segments(canonical, |segment| snake.convert(segment)).unwrap_or_default()
}

/// Every prefix of a dotted relation, shortest first, including itself.
pub(crate) fn relation_prefixes(relation: &str) -> impl Iterator<Item = &str> {
    relation
        .match_indices(RELATION_SEPARATOR)
        .filter_map(|(idx, _)| relation.get(..idx))
        .chain(std::iter::once(relation))
}

fn convert_segments(raw: &str, convert: impl Fn(&str) -> String) -> Option<String> {
    let mut out = Vec::new();
    for segment in raw.split(RELATION_SEPARATOR) {
        let segment = segment.trim();
        if segment.is_empty() {
            return None;
        }
        out.push(convert(segment));
    }
    Some(out.join(&RELATION_SEPARATOR.to_string()))
}
