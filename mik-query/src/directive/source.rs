//! Raw directive sources.
//!
//! A [`DirectiveSource`] hands out parameter values exactly as the client
//! sent them. Splitting, trimming and case conversion happen later, in
//! [`DirectiveSet::from_source`](super::DirectiveSet::from_source).

use super::FilterValue;
use crate::constants::MAX_DECODED_LEN;
use crate::error::DecodeError;

/// Access to raw request parameters.
///
/// Absent parameters yield `None` or an empty list, never an error.
pub trait DirectiveSource {
    /// Value of a plain parameter such as `sort=-created_at`.
    fn value(&self, parameter: &str) -> Option<FilterValue>;

    /// Entries of a bracketed parameter such as `filter[title]=hello`, in
    /// request order.
    fn entries(&self, parameter: &str) -> Vec<(String, FilterValue)>;
}

/// Decoded URL query parameters.
///
/// Supports the bracket conventions used by directive parameters:
///
/// | Query                         | Meaning                          |
/// |-------------------------------|----------------------------------|
/// | `sort=-age`                   | plain value                      |
/// | `sort=a&sort=b`, `sort[]=a`   | list value                       |
/// | `filter[title]=x`             | entry `title` → `x`              |
/// | `filter[id][]=1&filter[id][]=2` | entry `id` → list              |
/// | `filter[price][min]=10`       | entry `price` → map              |
///
/// ```
/// use mik_query::{DirectiveSource, FilterValue, QueryParams};
///
/// let params = QueryParams::parse("/posts?filter[title]=hello%20world&sort=-age");
/// assert_eq!(params.value("sort"), Some(FilterValue::from("-age")));
/// assert_eq!(
///     params.entries("filter"),
///     vec![("title".to_string(), FilterValue::from("hello world"))]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a query string.
    ///
    /// A leading path up to the first `?` is ignored, as is any `#fragment`.
    /// Text before the first `?` that contains `=` or `&` is already part of
    /// the query, so `filter[title]=why?` keeps its `?`.
    pub fn parse(query: &str) -> Self {
        let query = strip_path(query);
        let query = query.split_once('#').map_or(query, |(q, _)| q);

        let mut pairs = Vec::new();
        let mut dropped_count = 0u32;
        let mut last_error = None;

        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match url_decode(key).and_then(|key| url_decode(value).map(|value| (key, value))) {
                Ok(decoded) => pairs.push(decoded),
                Err(err) => {
                    dropped_count += 1;
                    last_error = Some(err);
                },
            }
        }

        if let Some(err) = last_error {
            tracing::warn!(
                dropped = dropped_count,
                error = %err,
                "query param decode failed, dropped param(s)"
            );
        }

        Self { pairs }
    }

    /// Build from already decoded key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// First value of a parameter, matched on the full key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of decoded pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the query had no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl DirectiveSource for QueryParams {
    fn value(&self, parameter: &str) -> Option<FilterValue> {
        let mut values = Vec::new();
        let mut listed = false;

        for (key, value) in &self.pairs {
            let (base, segments) = split_key(key);
            if base != parameter {
                continue;
            }
            match segments.as_slice() {
                [] => values.push(value.clone()),
                [""] => {
                    listed = true;
                    values.push(value.clone());
                },
                _ => {},
            }
        }

        match values.len() {
            0 => None,
            1 if !listed => values.pop().map(FilterValue::Text),
            _ => Some(FilterValue::List(
                values.into_iter().map(FilterValue::Text).collect(),
            )),
        }
    }

    fn entries(&self, parameter: &str) -> Vec<(String, FilterValue)> {
        let mut out: Vec<(String, FilterValue)> = Vec::new();

        for (key, value) in &self.pairs {
            let (base, segments) = split_key(key);
            if base != parameter {
                continue;
            }
            let Some((name, rest)) = segments.split_first() else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let incoming = match rest {
                [] => FilterValue::Text(value.clone()),
                [""] => FilterValue::List(vec![FilterValue::Text(value.clone())]),
                [sub] => FilterValue::Map(
                    [((*sub).to_string(), FilterValue::Text(value.clone()))]
                        .into_iter()
                        .collect(),
                ),
                // Deeper nesting is not a directive shape
                _ => continue,
            };

            match out.iter_mut().find(|(n, _)| n == name) {
                Some((_, slot)) => merge(slot, incoming),
                None => out.push(((*name).to_string(), incoming)),
            }
        }

        out
    }
}

impl DirectiveSource for serde_json::Value {
    fn value(&self, parameter: &str) -> Option<FilterValue> {
        self.get(parameter).and_then(FilterValue::from_json)
    }

    fn entries(&self, parameter: &str) -> Vec<(String, FilterValue)> {
        match self.get(parameter) {
            Some(serde_json::Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| FilterValue::from_json(v).map(|v| (k.clone(), v)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Merge a repeated entry into an existing one. Lists grow, maps gain new
/// keys, anything else keeps the first value.
fn merge(slot: &mut FilterValue, incoming: FilterValue) {
    match (slot, incoming) {
        (FilterValue::List(items), FilterValue::List(more)) => items.extend(more),
        (FilterValue::Map(map), FilterValue::Map(more)) => {
            for (k, v) in more {
                map.entry(k).or_insert(v);
            }
        },
        _ => {},
    }
}

/// Split `filter[price][min]` into `("filter", ["price", "min"])`.
///
/// A key with unbalanced or trailing brackets is returned whole with no
/// segments.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    let (base, mut rest) = key.split_at(open);

    let mut segments = Vec::new();
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return (key, Vec::new());
        };
        let Some((segment, after)) = inner.split_once(']') else {
            return (key, Vec::new());
        };
        segments.push(segment);
        rest = after;
    }

    (base, segments)
}

/// Drop a leading `/path?` if there is one.
fn strip_path(query: &str) -> &str {
    match query.split_once('?') {
        Some((path, rest)) if !path.contains(['=', '&']) => rest,
        _ => query,
    }
}

/// Percent-decode a query component, `+` decoding to a space.
///
/// Malformed escapes pass through unchanged. Output longer than
/// [`MAX_DECODED_LEN`] is an error.
fn url_decode(raw: &str) -> Result<String, DecodeError> {
    let input = raw.as_bytes();
    let mut out = Vec::with_capacity(input.len());
    let mut pos = 0;

    while let Some(&byte) = input.get(pos) {
        if out.len() >= MAX_DECODED_LEN {
            return Err(DecodeError::TooLong {
                limit: MAX_DECODED_LEN,
            });
        }

        match byte {
            b'%' => match input.get(pos + 1..pos + 3).and_then(hex_byte) {
                Some(decoded) => {
                    out.push(decoded);
                    pos += 3;
                },
                None => {
                    out.push(b'%');
                    pos += 1;
                },
            },
            b'+' => {
                out.push(b' ');
                pos += 1;
            },
            other => {
                out.push(other);
                pos += 1;
            },
        }
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn hex_byte(digits: &[u8]) -> Option<u8> {
    let [hi, lo] = digits else {
        return None;
    };
    let hi = char::from(*hi).to_digit(16)?;
    let lo = char::from(*lo).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}
