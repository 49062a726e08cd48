//! Contracts for the external query engine.
//!
//! Parsing a component file into a query string, compiling that string
//! against a schema, and resolving it per page are all external collaborators.
//! This module defines the data the pages core exchanges with them and the
//! [`QueryEngine`] seam the build layer plugs its GraphQL layer into.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Arbitrary key/value bag used for page context, query variables and
/// route metadata.
pub type Variables = serde_json::Map<String, Value>;

/// Result of parsing a component file.
///
/// Produced by the per-extension parse hook registered on
/// [`Pages`](crate::pages::Pages); cached per component identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// The data-fetch query embedded in the component, if any.
    pub query_source: Option<String>,

    /// Opaque render metadata extracted alongside the query.
    pub render_meta: Variables,
}

/// A query string compiled against the schema.
///
/// Opaque to the pages core except for the pagination flag, which drives
/// route-path augmentation.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedQuery {
    /// The original query source.
    pub source: String,

    /// Engine-specific parsed document.
    pub document: Value,

    /// Whether the query declares pagination.
    pub is_paginated: bool,
}

/// The resolved data-fetch contract for one concrete page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageQuery {
    /// Pagination spec, when the route's query paginates.
    pub paginate: Option<Value>,

    /// Variable bindings for this page.
    pub variables: Variables,

    /// Filter bindings derived from the variables.
    pub filters: Variables,
}

/// Compiles query strings and resolves them against per-page variables.
///
/// Implemented by the build layer on top of its GraphQL schema. The pages
/// core only caches the compiled descriptors and threads variables through.
pub trait QueryEngine: Send + Sync {
    /// Compiles a query string extracted from `component`.
    fn compile(&self, source: &str, component: &Path) -> Result<ParsedQuery>;

    /// Resolves a compiled query against one page's variables.
    fn resolve(&self, parsed: &ParsedQuery, variables: &Variables) -> PageQuery;
}

/// Engine used when no query layer is wired up.
///
/// Compiles every source to an empty document and passes variables through
/// unchanged, never paginating.
#[derive(Debug, Default)]
pub struct NullQueryEngine;

impl QueryEngine for NullQueryEngine {
    fn compile(&self, source: &str, _component: &Path) -> Result<ParsedQuery> {
        Ok(ParsedQuery {
            source: source.to_string(),
            document: Value::Null,
            is_paginated: false,
        })
    }

    fn resolve(&self, _parsed: &ParsedQuery, variables: &Variables) -> PageQuery {
        PageQuery {
            paginate: None,
            variables: variables.clone(),
            filters: Variables::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_engine_never_paginates() {
        let engine = NullQueryEngine;
        let parsed = engine
            .compile("query { posts }", Path::new("/site/Post.vue"))
            .unwrap();

        assert!(!parsed.is_paginated);
        assert_eq!(parsed.source, "query { posts }");
        assert!(parsed.document.is_null());
    }

    #[test]
    fn null_engine_passes_variables_through() {
        let engine = NullQueryEngine;
        let parsed = engine.compile("", Path::new("/site/Post.vue")).unwrap();

        let mut vars = Variables::new();
        vars.insert("id".into(), json!("42"));

        let query = engine.resolve(&parsed, &vars);

        assert_eq!(query.variables.get("id"), Some(&json!("42")));
        assert!(query.paginate.is_none());
        assert!(query.filters.is_empty());
    }
}
