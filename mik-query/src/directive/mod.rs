//! Normalized request directives.
//!
//! A [`DirectiveSet`] is the immutable snapshot of what the client asked
//! for: filters, sorts, includes and field selections. It is built once per
//! request from a [`DirectiveSource`] and then only read.
//!
//! Normalization never fails. Empty, malformed or unsafe pieces are dropped,
//! so "absent" and "empty" look the same to everything downstream.
//!
//! ```
//! use mik_query::{DirectiveSet, QueryConfig};
//!
//! let directives = DirectiveSet::from_query_string(
//!     "filter[title]=hello&sort=-created_at,title&include=author-profile&fields[posts]=id,title",
//!     &QueryConfig::default(),
//! );
//!
//! assert_eq!(directives.filter("title").and_then(|v| v.as_text()), Some("hello"));
//! assert_eq!(directives.sorts()[0].key, "created_at");
//! assert!(directives.sorts()[0].descending);
//! assert_eq!(directives.includes(), &["authorProfile".to_string()]);
//! assert_eq!(directives.fields_for("posts"), Some(&["id".to_string(), "title".to_string()][..]));
//! ```

mod naming;
mod parse;
mod source;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use naming::{canonical_relation, relation_fields_key};
pub(crate) use naming::relation_prefixes;
pub use source::{DirectiveSource, QueryParams};

use crate::config::QueryConfig;
use crate::constants::{DEFAULT_DELIMITER, DESCENDING_MARKER};
use crate::engine::SortDir;
use crate::error::NameSet;
use crate::validate::is_valid_sql_identifier;

/// A raw directive value as the client sent it.
///
/// Filter values are handed to strategies untouched; how a list or a nested
/// map is interpreted is up to the strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A single value (`filter[title]=hello`).
    Text(String),
    /// Repeated values (`filter[id][]=1&filter[id][]=2`).
    List(Vec<FilterValue>),
    /// Keyed values (`filter[price][min]=10`).
    Map(BTreeMap<String, FilterValue>),
}

impl FilterValue {
    /// The value as text, if it is a single value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::List(_) | Self::Map(_) => None,
        }
    }

    /// Text items of a single value or a list, in order.
    ///
    /// Nested lists and maps inside a list are skipped.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => vec![text.as_str()],
            Self::List(items) => items.iter().filter_map(Self::as_text).collect(),
            Self::Map(_) => Vec::new(),
        }
    }

    /// Convert a JSON value. `null` (at any depth) is treated as absent.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Self::Text(b.to_string())),
            serde_json::Value::Number(n) => Some(Self::Text(n.to_string())),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Array(items) => {
                Some(Self::List(items.iter().filter_map(Self::from_json).collect()))
            },
            serde_json::Value::Object(map) => Some(Self::Map(
                map.iter()
                    .filter_map(|(k, v)| Self::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(Self::from).collect())
    }
}

/// One requested sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// Column name without the direction marker.
    pub key: String,
    /// Whether the key carried the `-` marker.
    pub descending: bool,
}

impl SortDirective {
    /// Parse a single sort key such as `-created_at`.
    ///
    /// Returns `None` for empty keys and keys that are not plain SQL
    /// identifiers.
    ///
    /// ```
    /// use mik_query::SortDirective;
    ///
    /// let sort = SortDirective::parse("-created_at").unwrap();
    /// assert_eq!(sort.key, "created_at");
    /// assert!(sort.descending);
    ///
    /// assert!(SortDirective::parse("-").is_none());
    /// assert!(SortDirective::parse("id;DROP").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (key, descending) = match raw.strip_prefix(DESCENDING_MARKER) {
            Some(stripped) => (stripped.trim(), true),
            None => (raw, false),
        };
        if !is_valid_sql_identifier(key) {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            descending,
        })
    }

    /// ORDER BY direction.
    pub const fn dir(&self) -> SortDir {
        if self.descending {
            SortDir::Desc
        } else {
            SortDir::Asc
        }
    }
}

/// Normalized request intent.
///
/// All four collections default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectiveSet {
    filters: Vec<(String, FilterValue)>,
    sorts: Vec<SortDirective>,
    includes: Vec<String>,
    fields: BTreeMap<String, Vec<String>>,
}

impl DirectiveSet {
    /// An empty directive set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize directives from a raw parameter source.
    pub fn from_source(source: &impl DirectiveSource, config: &QueryConfig) -> Self {
        let names = &config.parameters;
        let delimiter = config.delimiter;

        let directives = Self {
            filters: parse::normalize_filters(source.entries(&names.filter)),
            sorts: parse::normalize_sorts(source.value(&names.sort).as_ref(), delimiter),
            includes: parse::normalize_includes(source.value(&names.include).as_ref(), delimiter),
            fields: parse::normalize_fields(source.entries(&names.fields), delimiter),
        };

        tracing::debug!(
            filters = directives.filters.len(),
            sorts = directives.sorts.len(),
            includes = directives.includes.len(),
            fields = directives.fields.len(),
            "normalized request directives"
        );

        directives
    }

    /// Normalize directives from a URL query string.
    pub fn from_query_string(query: &str, config: &QueryConfig) -> Self {
        Self::from_source(&QueryParams::parse(query), config)
    }

    /// Normalize directives from a JSON object such as
    /// `{"filter": {"title": "hello"}, "sort": "-created_at"}`.
    pub fn from_json(json: &str, config: &QueryConfig) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(Self::from_source(&value, config))
    }

    /// Add a filter. An existing filter with the same name is kept.
    #[must_use]
    pub fn with_filter(mut self, name: &str, value: impl Into<FilterValue>) -> Self {
        let entries = vec![(name.to_string(), value.into())];
        for (name, value) in parse::normalize_filters(entries) {
            if self.filter(&name).is_none() {
                self.filters.push((name, value));
            }
        }
        self
    }

    /// Append sort keys, e.g. `"-created_at,title"`.
    #[must_use]
    pub fn with_sort(mut self, raw: &str) -> Self {
        let value = FilterValue::from(raw);
        self.sorts
            .extend(parse::normalize_sorts(Some(&value), DEFAULT_DELIMITER));
        self
    }

    /// Add includes, e.g. `"author-profile,comments"`.
    #[must_use]
    pub fn with_include(mut self, raw: &str) -> Self {
        let value = FilterValue::from(raw);
        for include in parse::normalize_includes(Some(&value), DEFAULT_DELIMITER) {
            if !self.includes.contains(&include) {
                self.includes.push(include);
            }
        }
        self
    }

    /// Add a field selection for a table or relation key.
    #[must_use]
    pub fn with_fields(mut self, key: &str, columns: &[&str]) -> Self {
        let entries = vec![(key.to_string(), FilterValue::from(columns.to_vec()))];
        for (key, columns) in parse::normalize_fields(entries, DEFAULT_DELIMITER) {
            self.fields.entry(key).or_insert(columns);
        }
        self
    }

    /// Requested filters in request order.
    pub fn filters(&self) -> &[(String, FilterValue)] {
        &self.filters
    }

    /// Value of one requested filter.
    pub fn filter(&self, name: &str) -> Option<&FilterValue> {
        self.filters.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Names of every requested filter.
    pub fn filter_names(&self) -> NameSet {
        self.filters.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Requested sorts in ORDER BY order.
    pub fn sorts(&self) -> &[SortDirective] {
        &self.sorts
    }

    /// Requested sorts, or `default` when the client sent none.
    ///
    /// An unparseable default yields no sorts.
    pub fn sorts_or(&self, default: &str) -> Vec<SortDirective> {
        if self.sorts.is_empty() {
            SortDirective::parse(default).into_iter().collect()
        } else {
            self.sorts.clone()
        }
    }

    /// Requested relations, canonical names, request order, no duplicates.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Requested field selections keyed as sent.
    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// Field selection for one table or relation key.
    pub fn fields_for(&self, key: &str) -> Option<&[String]> {
        self.fields.get(key).map(Vec::as_slice)
    }

    /// Whether the client sent no directives at all.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
            && self.sorts.is_empty()
            && self.includes.is_empty()
            && self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let directives = DirectiveSet::new();
        assert!(directives.is_empty());
        assert!(directives.filters().is_empty());
        assert!(directives.sorts().is_empty());
        assert!(directives.includes().is_empty());
        assert!(directives.fields().is_empty());
    }

    #[test]
    fn test_sort_directive_parse() {
        assert_eq!(
            SortDirective::parse(" name "),
            Some(SortDirective {
                key: "name".into(),
                descending: false
            })
        );
        assert_eq!(SortDirective::parse("-age").unwrap().dir(), SortDir::Desc);
        assert_eq!(SortDirective::parse("age").unwrap().dir(), SortDir::Asc);
        assert!(SortDirective::parse("").is_none());
        assert!(SortDirective::parse("--age").is_none());
        assert!(SortDirective::parse("age desc").is_none());
    }

    #[test]
    fn test_sorts_or_uses_default_only_when_empty() {
        let empty = DirectiveSet::new();
        let sorts = empty.sorts_or("-created_at");
        assert_eq!(sorts.len(), 1);
        assert_eq!(sorts[0].key, "created_at");
        assert!(sorts[0].descending);

        let explicit = DirectiveSet::new().with_sort("title");
        let sorts = explicit.sorts_or("-created_at");
        assert_eq!(sorts.len(), 1);
        assert_eq!(sorts[0].key, "title");

        assert!(empty.sorts_or("").is_empty());
    }

    #[test]
    fn test_builders_normalize() {
        let directives = DirectiveSet::new()
            .with_filter(" title ", "hello")
            .with_filter("title", "ignored")
            .with_sort("-age,name")
            .with_include("author-profile,author_profile,comments")
            .with_fields("posts", &["id", "title; --", "body"]);

        assert_eq!(directives.filters().len(), 1);
        assert_eq!(directives.filter("title"), Some(&FilterValue::from("hello")));
        assert_eq!(directives.sorts().len(), 2);
        assert_eq!(
            directives.includes(),
            &["authorProfile".to_string(), "comments".to_string()]
        );
        assert_eq!(
            directives.fields_for("posts"),
            Some(&["id".to_string(), "body".to_string()][..])
        );
        assert!(!directives.is_empty());
    }

    #[test]
    fn test_filter_names() {
        let directives = DirectiveSet::new()
            .with_filter("title", "a")
            .with_filter("status", vec!["draft", "published"]);
        let names: Vec<String> = directives.filter_names().into_iter().collect();
        assert_eq!(names, vec!["status".to_string(), "title".to_string()]);
    }

    #[test]
    fn test_filter_value_texts() {
        assert_eq!(FilterValue::from("a").texts(), vec!["a"]);
        assert_eq!(FilterValue::from(vec!["a", "b"]).texts(), vec!["a", "b"]);
        assert!(FilterValue::Map(BTreeMap::new()).texts().is_empty());
        assert_eq!(FilterValue::from(vec!["a"]).as_text(), None);
    }

    #[test]
    fn test_filter_value_from_json() {
        let json = serde_json::json!({
            "a": "x",
            "b": 3,
            "c": [true, null, "y"],
            "d": null
        });
        let value = FilterValue::from_json(&json).unwrap();
        let FilterValue::Map(map) = value else {
            panic!("expected map")
        };
        assert_eq!(map.get("a"), Some(&FilterValue::from("x")));
        assert_eq!(map.get("b"), Some(&FilterValue::from("3")));
        assert_eq!(map.get("c"), Some(&FilterValue::from(vec!["true", "y"])));
        assert!(!map.contains_key("d"));
        assert_eq!(FilterValue::from_json(&serde_json::Value::Null), None);
    }

    #[test]
    fn test_from_json_document() {
        let directives = DirectiveSet::from_json(
            r#"{
                "filter": {"title": "hello", "tag": ["a", "b"]},
                "sort": ["-created_at", "title"],
                "include": "author-profile",
                "fields": {"posts": "id,title", "author_profile": ["id", "bio"]}
            }"#,
            &QueryConfig::default(),
        )
        .unwrap();

        assert_eq!(directives.filter("title"), Some(&FilterValue::from("hello")));
        assert_eq!(directives.filter("tag"), Some(&FilterValue::from(vec!["a", "b"])));
        let keys: Vec<&str> = directives.sorts().iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["created_at", "title"]);
        assert_eq!(directives.includes(), &["authorProfile".to_string()]);
        assert_eq!(
            directives.fields_for("author_profile"),
            Some(&["id".to_string(), "bio".to_string()][..])
        );
    }

    #[test]
    fn test_from_json_rejects_invalid_document() {
        assert!(DirectiveSet::from_json("{not json", &QueryConfig::default()).is_err());
    }

    #[test]
    fn test_from_json_non_object_is_empty() {
        let directives = DirectiveSet::from_json("[1, 2]", &QueryConfig::default()).unwrap();
        assert!(directives.is_empty());
    }
}
