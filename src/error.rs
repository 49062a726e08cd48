//! Error types for the pages core.
//!
//! All table-mutation failures are synchronous and surfaced to the direct
//! caller; no operation leaves a partial mutation behind and nothing is
//! retried automatically. Cache invalidation cannot fail (removing a missing
//! entry is a no-op), so no variant exists for it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PagesError>;

/// Errors produced by route and page table operations.
#[derive(Debug, Error)]
pub enum PagesError {
    /// Malformed input to a create/update operation.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A page path does not satisfy the pattern of the route it is bound to.
    #[error("page path does not match route path: {page_path} (route: {route_path})")]
    PathMismatch {
        /// The offending page path.
        page_path: String,
        /// The pattern of the target route.
        route_path: String,
    },

    /// An update or remove targeted an id that is not stored.
    #[error("no record with id {id}{}", .path.as_deref().map(|p| format!(" (path: {p})")).unwrap_or_default())]
    NotFound {
        /// The id that missed.
        id: String,
        /// The attempted path, when the caller supplied one.
        path: Option<String>,
    },

    /// A route path could not be compiled into a matcher.
    #[error("cannot compile route pattern {path}: {message}")]
    Pattern {
        /// The pattern string that failed.
        path: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// A component file could not be read for parsing.
    #[error("cannot read component {path}: {source}")]
    Component {
        /// The component file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The query compiler rejected a component's query string.
    #[error("query for component {component} failed to compile: {message}")]
    Query {
        /// The component the query came from.
        component: PathBuf,
        /// Compiler diagnostic.
        message: String,
    },
}

impl PagesError {
    /// Shorthand for a [`PagesError::NotFound`] without an attempted path.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_mismatch_message_names_both_paths() {
        let err = PagesError::PathMismatch {
            page_path: "/other".into(),
            route_path: "/blog/:slug".into(),
        };
        let message = err.to_string();

        assert!(message.contains("does not match"));
        assert!(message.contains("/other"));
        assert!(message.contains("/blog/:slug"));
    }

    #[test]
    fn not_found_message_includes_path_when_present() {
        let err = PagesError::NotFound {
            id: "abc123".into(),
            path: Some("/page".into()),
        };

        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("/page"));
    }

    #[test]
    fn not_found_message_omits_path_when_absent() {
        let err = PagesError::not_found("abc123");

        assert!(!err.to_string().contains("path:"));
    }
}
