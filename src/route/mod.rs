//! Route records and the indexed route table.
//!
//! A route binds a URL pattern to a template component, carries a compiled
//! matcher and a priority score, and owns zero or more concrete pages.

mod priority;
mod table;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::pattern::RoutePattern;
use crate::query::{ParsedQuery, Variables};

pub use priority::resolve_priority;
pub use table::RouteTable;

/// Whether a route's pattern contains parameter segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// No parameter segments; pages are added explicitly.
    Static,
    /// Contains parameter segments; has exactly one implicit page whose
    /// path equals the route's own path.
    Dynamic,
}

impl RouteKind {
    /// Derives the kind from a path pattern.
    pub fn of(path: &str) -> Self {
        if path.contains(':') {
            Self::Dynamic
        } else {
            Self::Static
        }
    }
}

/// Lifecycle bookkeeping stamped on routes and pages by their creator.
///
/// `generation` marks the rebuild cycle of the most recent touch; the
/// garbage collector sweeps unmanaged records from older generations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordMeta {
    /// Rebuild cycle this record was last produced in.
    pub generation: u64,
    /// Managed records are exempt from per-cycle garbage collection.
    pub is_managed: bool,
}

impl RecordMeta {
    /// Meta for a managed record in the given generation.
    pub fn managed(generation: u64) -> Self {
        Self {
            generation,
            is_managed: true,
        }
    }

    /// Meta for an unmanaged record in the given generation.
    pub fn unmanaged(generation: u64) -> Self {
        Self {
            generation,
            is_managed: false,
        }
    }
}

/// The route's data-fetch contract, shared by all its pages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteQuery {
    /// The raw query string extracted from the component, if any.
    pub source: Option<String>,
    /// The compiled query document, if any.
    #[serde(skip)]
    pub document: Option<Arc<ParsedQuery>>,
    /// Whether the query paginates (drives path augmentation).
    pub is_paginated: bool,
}

/// Internal route fields not part of the public identity.
#[derive(Debug, Clone, Serialize)]
pub struct RouteInternal {
    /// The pattern before pagination augmentation.
    pub path: String,
    /// Priority score; higher matches first. Computed from the
    /// pre-pagination path.
    pub priority: i64,
    /// Compiled matcher for the full (augmented) pattern.
    #[serde(skip)]
    pub pattern: RoutePattern,
    /// Data-fetch contract.
    pub query: RouteQuery,
    /// Opaque metadata propagated from the creator.
    pub meta: Variables,
    /// Lifecycle bookkeeping.
    pub record: RecordMeta,
}

/// A URL pattern bound to a template component.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    /// Content-derived stable identifier, unique across the table.
    pub id: String,
    /// Static or dynamic.
    pub kind: RouteKind,
    /// Symbolic name; auto-derived for dynamic routes when absent.
    pub name: Option<String>,
    /// The full pattern, including any pagination segment. Unique.
    pub path: String,
    /// Identity of the bound template component.
    pub component: PathBuf,
    /// Internal fields.
    pub internal: RouteInternal,
    /// Storage identity, preserved across upserts; also the insertion-order
    /// tie-breaker for equal priorities.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl Route {
    /// True when the route survives garbage collection unconditionally.
    pub fn is_managed(&self) -> bool {
        self.internal.record.is_managed
    }
}

/// Input to route creation and update.
#[derive(Debug, Clone, Default)]
pub struct RouteInput {
    /// Explicit id; derived from the path when absent.
    pub id: Option<String>,
    /// The URL pattern. Required.
    pub path: String,
    /// The bound component. Required.
    pub component: PathBuf,
    /// Symbolic name.
    pub name: Option<String>,
    /// Opaque metadata stored on the route.
    pub meta: Option<Variables>,
}

impl RouteInput {
    /// Convenience constructor for the required fields.
    pub fn new(path: impl Into<String>, component: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            component: component.into(),
            ..Self::default()
        }
    }
}
