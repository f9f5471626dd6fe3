//! Error types for directive guarding and configuration loading.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

/// A set of directive names, ordered for stable diagnostics.
pub type NameSet = BTreeSet<String>;

/// Raised when a declaration call rejects the request.
///
/// The three `*NotAllowed` variants are client errors and carry both the
/// offending names and the full allowed set so the HTTP layer can build a
/// useful 400 response. [`QueryError::Internal`] is never caused by client
/// input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum QueryError {
    /// One or more requested filters are not in the allowed list.
    #[error(
        "requested filter(s) `{}` are not allowed, allowed filter(s) are `{}`",
        join_names(.offending),
        join_names(.allowed)
    )]
    FilterNotAllowed {
        /// Requested filter names missing from the allow-list.
        offending: NameSet,
        /// Every allowed filter name.
        allowed: NameSet,
    },
    /// One or more requested sort keys are not in the allowed list.
    #[error(
        "requested sort(s) `{}` are not allowed, allowed sort(s) are `{}`",
        join_names(.offending),
        join_names(.allowed)
    )]
    SortNotAllowed {
        /// Requested sort keys (without direction marker) missing from the allow-list.
        offending: NameSet,
        /// Every allowed sort key.
        allowed: NameSet,
    },
    /// One or more requested includes are not in the allowed list.
    #[error(
        "requested include(s) `{}` are not allowed, allowed include(s) are `{}`",
        join_names(.offending),
        join_names(.allowed)
    )]
    IncludeNotAllowed {
        /// Requested relation names missing from the allow-list.
        offending: NameSet,
        /// Every allowed relation name, including implied prefixes.
        allowed: NameSet,
    },
    /// Guard and apply disagreed about a directive.
    #[error("internal query assembly error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Whether the error was caused by the client's request.
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// HTTP status code the error should map to.
    pub const fn status_code(&self) -> u16 {
        if self.is_client_error() { 400 } else { 500 }
    }

    /// Names the client asked for that were rejected.
    pub const fn offending(&self) -> Option<&NameSet> {
        match self {
            Self::FilterNotAllowed { offending, .. }
            | Self::SortNotAllowed { offending, .. }
            | Self::IncludeNotAllowed { offending, .. } => Some(offending),
            Self::Internal(_) => None,
        }
    }

    /// Names the caller declared as allowed for the rejected category.
    pub const fn allowed(&self) -> Option<&NameSet> {
        match self {
            Self::FilterNotAllowed { allowed, .. }
            | Self::SortNotAllowed { allowed, .. }
            | Self::IncludeNotAllowed { allowed, .. } => Some(allowed),
            Self::Internal(_) => None,
        }
    }
}

fn join_names(names: &NameSet) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Raised when a query string component cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Decoded output would exceed the size limit.
    #[error("url decoded output exceeds maximum length ({}KB limit)", .limit / 1024)]
    TooLong {
        /// Maximum decoded length in bytes.
        limit: usize,
    },
}

/// Raised when a [`QueryConfig`](crate::QueryConfig) cannot be loaded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read query config `{}`", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config document is not valid.
    #[error("invalid query config: {0}")]
    Parse(#[from] toml::de::Error),
}
