//! Normalization of raw directive values.

use std::collections::BTreeMap;

use super::naming::canonical_relation;
use super::{FilterValue, SortDirective};
use crate::constants::MAX_DIRECTIVES;
use crate::validate::is_valid_sql_identifier;

/// Trim filter names, drop empty ones and keep the first of each name.
pub(super) fn normalize_filters(entries: Vec<(String, FilterValue)>) -> Vec<(String, FilterValue)> {
    let mut out: Vec<(String, FilterValue)> = Vec::new();
    for (name, value) in entries {
        let name = name.trim();
        if name.is_empty() || out.iter().any(|(n, _)| n == name) {
            continue;
        }
        out.push((name.to_string(), value));
    }
    cap("filter", out)
}

/// Split sort keys and strip direction markers, keeping request order.
pub(super) fn normalize_sorts(value: Option<&FilterValue>, delimiter: char) -> Vec<SortDirective> {
    let Some(value) = value else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for item in split_items(value, delimiter) {
        match SortDirective::parse(item) {
            Some(sort) => out.push(sort),
            None => tracing::warn!(sort = item, "dropping malformed sort directive"),
        }
    }
    cap("sort", out)
}

/// Split includes and convert each to its canonical relation name.
pub(super) fn normalize_includes(value: Option<&FilterValue>, delimiter: char) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };

    let mut out: Vec<String> = Vec::new();
    for item in split_items(value, delimiter) {
        match canonical_relation(item) {
            Some(relation) if !out.contains(&relation) => out.push(relation),
            Some(_) => {},
            None => tracing::warn!(include = item, "dropping malformed include directive"),
        }
    }
    cap("include", out)
}

/// Split column lists, keyed by the literal table or relation key.
pub(super) fn normalize_fields(
    entries: Vec<(String, FilterValue)>,
    delimiter: char,
) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in entries {
        let key = key.trim();
        if key.is_empty() || out.contains_key(key) || out.len() >= MAX_DIRECTIVES {
            continue;
        }

        let mut columns: Vec<String> = Vec::new();
        for column in split_items(&value, delimiter) {
            if !is_valid_sql_identifier(column) {
                tracing::warn!(key, column, "dropping malformed field selection");
                continue;
            }
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }

        if !columns.is_empty() {
            out.insert(key.to_string(), columns);
        }
    }
    out
}

/// Every non-empty, trimmed item of a text or list value.
fn split_items(value: &FilterValue, delimiter: char) -> Vec<&str> {
    value
        .texts()
        .into_iter()
        .flat_map(|text| text.split(delimiter))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn cap<T>(category: &str, mut items: Vec<T>) -> Vec<T> {
    if items.len() > MAX_DIRECTIVES {
        tracing::warn!(
            category,
            received = items.len(),
            max = MAX_DIRECTIVES,
            "too many directives, extra ones dropped"
        );
        items.truncate(MAX_DIRECTIVES);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FilterValue {
        FilterValue::from(s)
    }

    #[test]
    fn test_filters_trim_and_dedupe() {
        let out = normalize_filters(vec![
            (" title".into(), text("a")),
            ("".into(), text("b")),
            ("title".into(), text("c")),
            ("status".into(), text("d")),
        ]);
        assert_eq!(
            out,
            vec![("title".to_string(), text("a")), ("status".to_string(), text("d"))]
        );
    }

    #[test]
    fn test_filter_values_pass_through() {
        let nested = FilterValue::Map(BTreeMap::from([("min".to_string(), text(" 10 "))]));
        let out = normalize_filters(vec![("price".into(), nested.clone())]);
        assert_eq!(out, vec![("price".to_string(), nested)]);
    }

    #[test]
    fn test_sorts_keep_order_and_direction() {
        let out = normalize_sorts(Some(&text("-age, name ,,-created_at")), ',');
        let pairs: Vec<(&str, bool)> = out.iter().map(|s| (s.key.as_str(), s.descending)).collect();
        assert_eq!(pairs, vec![("age", true), ("name", false), ("created_at", true)]);
    }

    #[test]
    fn test_sorts_drop_unsafe_keys() {
        let out = normalize_sorts(Some(&text("name,id;DROP TABLE posts,-")), ',');
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "name");
    }

    #[test]
    fn test_sorts_absent_or_empty() {
        assert!(normalize_sorts(None, ',').is_empty());
        assert!(normalize_sorts(Some(&text("")), ',').is_empty());
        assert!(normalize_sorts(Some(&text(" , ")), ',').is_empty());
    }

    #[test]
    fn test_sorts_from_list_value() {
        let out = normalize_sorts(Some(&FilterValue::from(vec!["-a,b", "c"])), ',');
        let keys: Vec<&str> = out.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_custom_delimiter() {
        let out = normalize_sorts(Some(&text("a;-b")), ';');
        assert_eq!(out.len(), 2);
        assert!(out[1].descending);
    }

    #[test]
    fn test_includes_canonicalized_and_deduped() {
        let out = normalize_includes(
            Some(&text("author-profile,comments,author_profile,posts..x")),
            ',',
        );
        assert_eq!(out, vec!["authorProfile".to_string(), "comments".to_string()]);
    }

    #[test]
    fn test_fields_keys_are_literal() {
        let out = normalize_fields(
            vec![
                ("posts".into(), text("id,title")),
                ("author_profile".into(), text("id, bio,id")),
                ("authorProfile".into(), text("name")),
            ],
            ',',
        );
        assert_eq!(out.get("posts"), Some(&vec!["id".to_string(), "title".to_string()]));
        assert_eq!(
            out.get("author_profile"),
            Some(&vec!["id".to_string(), "bio".to_string()])
        );
        // No case conversion on keys
        assert_eq!(out.get("authorProfile"), Some(&vec!["name".to_string()]));
    }

    #[test]
    fn test_fields_drop_empty_entries() {
        let out = normalize_fields(
            vec![
                ("posts".into(), text("")),
                ("".into(), text("id")),
                ("users".into(), text("password)")),
            ],
            ',',
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_directive_cap() {
        let raw: Vec<String> = (0..MAX_DIRECTIVES + 10).map(|i| format!("c{i}")).collect();
        let out = normalize_sorts(Some(&text(&raw.join(","))), ',');
        assert_eq!(out.len(), MAX_DIRECTIVES);
        assert_eq!(out[0].key, "c0");
    }
}
