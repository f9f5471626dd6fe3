//! Request format configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! delimiter = ","
//!
//! [parameters]
//! filter = "filter"
//! sort = "sort"
//! include = "include"
//! fields = "fields"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DELIMITER, DEFAULT_FIELDS_PARAMETER, DEFAULT_FILTER_PARAMETER,
    DEFAULT_INCLUDE_PARAMETER, DEFAULT_SORT_PARAMETER,
};
use crate::error::ConfigError;

/// How directives are named and separated in an inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct QueryConfig {
    /// Names of the four directive parameters.
    pub parameters: ParameterNames,
    /// Separator between list items (`sort=a,b`).
    pub delimiter: char,
}

/// Query parameter names for each directive category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct ParameterNames {
    /// Bracketed filter parameter (`filter[name]=value`).
    pub filter: String,
    /// Comma separated sort keys.
    pub sort: String,
    /// Comma separated relation names.
    pub include: String,
    /// Bracketed field selection (`fields[table]=a,b`).
    pub fields: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER_PARAMETER.to_string(),
            sort: DEFAULT_SORT_PARAMETER.to_string(),
            include: DEFAULT_INCLUDE_PARAMETER.to_string(),
            fields: DEFAULT_FIELDS_PARAMETER.to_string(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            parameters: ParameterNames::default(),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl QueryConfig {
    /// Parse a config from a TOML document.
    ///
    /// # Example
    ///
    /// ```
    /// use mik_query::QueryConfig;
    ///
    /// let config = QueryConfig::from_toml_str("delimiter = \";\"").unwrap();
    /// assert_eq!(config.delimiter, ';');
    /// assert_eq!(config.parameters.sort, "sort");
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str(source)?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "loaded query config");
        Ok(config)
    }

    /// Replace the parameter names.
    #[must_use]
    pub fn with_parameters(mut self, parameters: ParameterNames) -> Self {
        self.parameters = parameters;
        self
    }

    /// Replace the list delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl ParameterNames {
    /// Parameter names with a common prefix, e.g. `q_filter`, `q_sort`.
    pub fn prefixed(prefix: &str) -> Self {
        let defaults = Self::default();
        Self {
            filter: format!("{prefix}{}", defaults.filter),
            sort: format!("{prefix}{}", defaults.sort),
            include: format!("{prefix}{}", defaults.include),
            fields: format!("{prefix}{}", defaults.fields),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = QueryConfig::from_toml_str("").unwrap();
        assert_eq!(config, QueryConfig::default());
        assert_eq!(config.parameters.filter, "filter");
        assert_eq!(config.parameters.fields, "fields");
        assert_eq!(config.delimiter, ',');
    }

    #[test]
    fn test_partial_parameter_table() {
        let config = QueryConfig::from_toml_str(
            r#"
            [parameters]
            sort = "order"
            "#,
        )
        .unwrap();
        assert_eq!(config.parameters.sort, "order");
        assert_eq!(config.parameters.include, "include");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = QueryConfig::from_toml_str("limit = 10").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_multi_char_delimiter_is_rejected() {
        assert!(QueryConfig::from_toml_str("delimiter = \";;\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = QueryConfig::load("/definitely/not/here/query.toml").unwrap_err();
        let ConfigError::Io { path, .. } = err else {
            panic!("expected Io error, got {err:?}")
        };
        assert!(path.ends_with("query.toml"));
    }

    #[test]
    fn test_prefixed_parameter_names() {
        let names = ParameterNames::prefixed("q_");
        assert_eq!(names.filter, "q_filter");
        assert_eq!(names.sort, "q_sort");
        assert_eq!(names.include, "q_include");
        assert_eq!(names.fields, "q_fields");
    }

    #[test]
    fn test_builder_methods() {
        let config = QueryConfig::default()
            .with_delimiter('|')
            .with_parameters(ParameterNames::prefixed("x"));
        assert_eq!(config.delimiter, '|');
        assert_eq!(config.parameters.include, "xinclude");
    }
}
