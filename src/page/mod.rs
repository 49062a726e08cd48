//! Page records and the indexed page table.
//!
//! A page is a concrete, renderable instance of a route with resolved
//! data-query variables. Every page is bound to exactly one route by id;
//! the binding is non-owning (the route table is authoritative).

mod table;

use serde::Serialize;

use crate::query::{PageQuery, Variables};
use crate::route::RecordMeta;

pub use table::PageTable;

/// Internal page fields not part of the public identity.
#[derive(Debug, Clone, Serialize)]
pub struct PageInternal {
    /// Resolved data-fetch contract for this specific page.
    pub query: PageQuery,
    /// Whether the path itself contains parameter markers.
    pub is_dynamic: bool,
    /// Lifecycle bookkeeping.
    pub record: RecordMeta,
}

/// A concrete URL path bound to a route.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Explicit or content-derived identifier, unique across the table.
    pub id: String,
    /// Concrete URL path, duplicate slashes collapsed. Unique.
    pub path: String,
    /// Id of the owning route.
    pub route: String,
    /// Arbitrary context made available to the page's query as variables
    /// unless explicit query variables are supplied.
    pub context: Variables,
    /// Internal fields.
    pub internal: PageInternal,
    /// Storage identity, preserved across upserts.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Page {
    /// True when the page survives garbage collection unconditionally.
    pub fn is_managed(&self) -> bool {
        self.internal.record.is_managed
    }
}

/// Input to page creation on an existing route.
#[derive(Debug, Clone, Default)]
pub struct PageInput {
    /// Explicit id; derived from the normalized path when absent.
    pub id: Option<String>,
    /// The page's concrete path. Required.
    pub path: String,
    /// Context bag; used as query variables when no explicit variables are
    /// given.
    pub context: Option<Variables>,
    /// Explicit query variables; take precedence over `context`.
    pub query_variables: Option<Variables>,
}

impl PageInput {
    /// Convenience constructor for the required field.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Collapses duplicate slashes in a path.
pub(crate) fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_collapses_duplicate_slashes() {
        assert_eq!(normalize_path("//a///b/"), "/a/b/");
        assert_eq!(normalize_path("/a/b"), "/a/b");
        assert_eq!(normalize_path("/"), "/");
    }
}
