//! The pages façade: the public contract of the route/page core.
//!
//! [`Pages`] owns the route and page tables, the parse caches, the watched
//! component set and the extension pipelines, and exposes the operations the
//! build layer drives: create/update/remove routes and pages, path matching,
//! and cache maintenance.
//!
//! All mutations are synchronous and atomic with respect to each other; a
//! failed operation leaves no partial state behind. Mutations emit
//! [`TableEvent`]s for the watch coordinator, which coalesces them into
//! debounced rebuild actions.

mod lifecycle;
mod watch;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::cache::{ComponentCache, QueryCache};
use crate::config::PagesConfig;
use crate::error::{PagesError, Result};
use crate::hash;
use crate::hooks::{ParseHooks, Waterfall};
use crate::page::{normalize_path, Page, PageInput, PageInternal, PageTable};
use crate::pattern::Params;
use crate::query::{
    ComponentSpec, NullQueryEngine, PageQuery, ParsedQuery, QueryEngine, Variables,
};
use crate::route::{
    resolve_priority, RecordMeta, Route, RouteInput, RouteInternal, RouteKind, RouteQuery,
    RouteTable,
};
use crate::pattern::RoutePattern;

pub use lifecycle::{CycleReport, PageScope, PhaseRunner};
pub use watch::{ChangeEvent, RebuildAction, WatchCoordinator, WatchHandle};

/// A resolved request path: the winning route and its decoded parameters.
#[derive(Debug, Clone)]
pub struct Match {
    /// The matched route.
    pub route: Route,
    /// Decoded parameters; empty for static routes.
    pub params: Params,
}

/// Notification emitted after a table mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    /// A route was inserted.
    RouteInserted {
        /// Route id.
        id: String,
    },
    /// A route was replaced in place.
    RouteUpdated {
        /// Route id.
        id: String,
        /// Whether the route's public path changed.
        path_changed: bool,
    },
    /// A route (and its pages) was removed.
    RouteRemoved {
        /// Route id.
        id: String,
    },
}

/// Input to page creation through the façade.
#[derive(Debug, Clone, Default)]
pub struct CreatePageInput {
    /// Explicit id; derived from the normalized path when absent.
    pub id: Option<String>,
    /// The page's concrete path. Required.
    pub path: String,
    /// The template component. Required.
    pub component: PathBuf,
    /// Context bag, exposed to the page query as variables unless explicit
    /// query variables are supplied.
    pub context: Option<Variables>,
    /// Explicit query variables; take precedence over `context`.
    pub query_variables: Option<Variables>,
}

impl CreatePageInput {
    /// Convenience constructor for the required fields.
    pub fn new(path: impl Into<String>, component: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            component: component.into(),
            ..Self::default()
        }
    }
}

/// The orchestrating façade over routes, pages, caches and hooks.
pub struct Pages {
    config: PagesConfig,
    routes: RouteTable,
    pages: PageTable,
    component_cache: ComponentCache,
    query_cache: QueryCache,
    parse_hooks: ParseHooks,
    route_pipeline: Waterfall<Route>,
    page_pipeline: Waterfall<Page>,
    engine: Arc<dyn QueryEngine>,
    watched: HashSet<PathBuf>,
    events: Option<UnboundedSender<TableEvent>>,
}

impl Pages {
    /// Creates a façade with no query layer wired up.
    pub fn new(config: PagesConfig) -> Self {
        Self::with_engine(config, Arc::new(NullQueryEngine))
    }

    /// Creates a façade backed by the given query engine.
    pub fn with_engine(config: PagesConfig, engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            component_cache: ComponentCache::new(config.component_cache_size),
            query_cache: QueryCache::new(config.query_cache_size),
            config,
            routes: RouteTable::new(),
            pages: PageTable::new(),
            parse_hooks: ParseHooks::default(),
            route_pipeline: Waterfall::new(),
            page_pipeline: Waterfall::new(),
            engine,
            watched: HashSet::new(),
            events: None,
        }
    }

    /// The configuration this façade was built with.
    pub fn config(&self) -> &PagesConfig {
        &self.config
    }

    /// Per-extension component parse hooks.
    pub fn parse_hooks_mut(&mut self) -> &mut ParseHooks {
        &mut self.parse_hooks
    }

    /// Route-creation interception pipeline (runs before storage).
    pub fn route_pipeline_mut(&mut self) -> &mut Waterfall<Route> {
        &mut self.route_pipeline
    }

    /// Page-creation interception pipeline (runs before storage).
    pub fn page_pipeline_mut(&mut self) -> &mut Waterfall<Page> {
        &mut self.page_pipeline
    }

    /// Wires the sink that receives [`TableEvent`]s.
    pub fn set_event_sink(&mut self, sink: UnboundedSender<TableEvent>) {
        self.events = Some(sink);
    }

    // ─── routes ──────────────────────────────────────────────────────────────

    /// Creates or replaces a route.
    ///
    /// When a route with the same id exists its storage identity is
    /// preserved and the fields are replaced. Newly inserted routes begin
    /// watching their component file.
    pub fn create_route(&mut self, input: RouteInput, meta: RecordMeta) -> Result<Route> {
        validate_route_input(&input)?;

        let draft = self.build_route(input, meta)?;
        let draft = self
            .route_pipeline
            .call(draft)
            .ok_or_else(|| PagesError::Validation("route creation vetoed by interceptor".into()))?;

        let previous_path = self.routes.get(&draft.id).map(|r| r.path.clone());
        let stored = self.routes.upsert(draft)?;

        match previous_path {
            Some(old_path) => {
                debug!(id = %stored.id, path = %stored.path, "route replaced");
                self.emit(TableEvent::RouteUpdated {
                    id: stored.id.clone(),
                    path_changed: old_path != stored.path,
                });
            }
            None => {
                debug!(id = %stored.id, path = %stored.path, priority = stored.internal.priority, "route created");
                self.watch_component(stored.component.clone());
                self.emit(TableEvent::RouteInserted {
                    id: stored.id.clone(),
                });
            }
        }

        Ok(stored)
    }

    /// Replaces an existing route, re-parsing its component.
    ///
    /// The component's cache entries are invalidated before recomputing, so
    /// a changed query never resolves from a stale parse. Fails with
    /// [`PagesError::NotFound`] when the route does not exist.
    pub fn update_route(&mut self, input: RouteInput, meta: RecordMeta) -> Result<Route> {
        validate_route_input(&input)?;

        self.clear_component_cache(&input.component);

        let draft = self.build_route(input, meta)?;
        let Some(existing) = self.routes.get(&draft.id) else {
            return Err(PagesError::NotFound {
                id: draft.id,
                path: Some(draft.internal.path),
            });
        };
        let old_path = existing.path.clone();

        let draft = self
            .route_pipeline
            .call(draft)
            .ok_or_else(|| PagesError::Validation("route update vetoed by interceptor".into()))?;
        let stored = self.routes.upsert(draft)?;

        debug!(id = %stored.id, path = %stored.path, "route updated");
        self.emit(TableEvent::RouteUpdated {
            id: stored.id.clone(),
            path_changed: old_path != stored.path,
        });

        Ok(stored)
    }

    /// Removes a route and every page bound to it.
    ///
    /// Stops watching the component when no other route references it.
    pub fn remove_route(&mut self, id: &str) -> Result<()> {
        let route = self
            .routes
            .remove(id)
            .ok_or_else(|| PagesError::not_found(id))?;

        let removed = self.pages.remove_by_route(id);
        self.unwatch_component(&route.component);

        debug!(id = %route.id, path = %route.path, pages = removed.len(), "route removed");
        self.emit(TableEvent::RouteRemoved {
            id: route.id.clone(),
        });

        Ok(())
    }

    /// Route by id.
    pub fn get_route(&self, id: &str) -> Option<Route> {
        self.routes.get(id).cloned()
    }

    /// All routes in descending priority order, ties by insertion order.
    pub fn routes(&mut self) -> Vec<Route> {
        self.routes.ordered()
    }

    /// Number of stored routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// A mutable handle scoped to one route.
    pub fn route(&mut self, id: &str) -> Option<RouteHandle<'_>> {
        if self.routes.get(id).is_none() {
            return None;
        }
        Some(RouteHandle {
            id: id.to_string(),
            pages: self,
        })
    }

    // ─── pages ───────────────────────────────────────────────────────────────

    /// Creates a page, implicitly creating (or refreshing) its route.
    pub fn create_page(&mut self, input: CreatePageInput, meta: RecordMeta) -> Result<Page> {
        validate_page_input(&input)?;

        let route = self.create_route(
            RouteInput::new(input.path.clone(), input.component.clone()),
            meta,
        )?;

        self.add_page(
            &route.id,
            PageInput {
                id: input.id,
                path: input.path,
                context: input.context,
                query_variables: input.query_variables,
            },
            meta,
        )
    }

    /// Replaces an existing page, refreshing its route.
    ///
    /// Fails with [`PagesError::NotFound`] naming the page id and path when
    /// no page with the derived id exists.
    pub fn update_page(&mut self, input: CreatePageInput, meta: RecordMeta) -> Result<Page> {
        validate_page_input(&input)?;

        let path = normalize_path(&input.path);
        let id = input
            .id
            .clone()
            .unwrap_or_else(|| hash::page_id(&path));
        if self.pages.get(&id).is_none() {
            return Err(PagesError::NotFound {
                id,
                path: Some(path),
            });
        }

        let route = self.update_route(
            RouteInput::new(input.path.clone(), input.component.clone()),
            meta,
        )?;

        self.add_page(
            &route.id,
            PageInput {
                id: input.id,
                path: input.path,
                context: input.context,
                query_variables: input.query_variables,
            },
            meta,
        )
    }

    /// Adds (or replaces) a page on an existing route.
    ///
    /// For a static route the path must satisfy the route's compiled
    /// pattern; for a dynamic route it must equal the route's own path.
    pub fn add_page(&mut self, route_id: &str, input: PageInput, meta: RecordMeta) -> Result<Page> {
        let route = self
            .routes
            .get(route_id)
            .ok_or_else(|| PagesError::not_found(route_id))?
            .clone();

        if input.path.is_empty() {
            return Err(PagesError::Validation("page path is required".into()));
        }
        let path = normalize_path(&input.path);

        match route.kind {
            RouteKind::Static => {
                if !route.internal.pattern.is_match(&path) {
                    return Err(PagesError::PathMismatch {
                        page_path: path,
                        route_path: route.path.clone(),
                    });
                }
            }
            RouteKind::Dynamic => {
                if route.internal.path != path {
                    return Err(PagesError::PathMismatch {
                        page_path: path,
                        route_path: route.internal.path.clone(),
                    });
                }
            }
        }

        let id = input.id.unwrap_or_else(|| hash::page_id(&path));

        // Explicit query variables win over context.
        let variables = input
            .query_variables
            .clone()
            .or_else(|| input.context.clone())
            .unwrap_or_default();

        let query = match &route.internal.query.document {
            Some(parsed) => self.engine.resolve(parsed, &variables),
            None => PageQuery::default(),
        };

        let draft = Page {
            id,
            path: path.clone(),
            route: route.id.clone(),
            context: input.context.unwrap_or_default(),
            internal: PageInternal {
                query,
                is_dynamic: path.contains(':'),
                record: meta,
            },
            seq: 0,
        };

        let draft = self
            .page_pipeline
            .call(draft)
            .ok_or_else(|| PagesError::Validation("page creation vetoed by interceptor".into()))?;

        let stored = self.pages.upsert(draft)?;
        debug!(id = %stored.id, path = %stored.path, route = %stored.route, "page stored");

        Ok(stored)
    }

    /// Removes a page.
    ///
    /// A dynamic route goes with its only page; a static route persists for
    /// future pages.
    pub fn remove_page(&mut self, id: &str) -> Result<()> {
        let page = self
            .pages
            .get(id)
            .ok_or_else(|| PagesError::not_found(id))?
            .clone();

        match self.routes.get(&page.route).map(|route| route.kind) {
            Some(RouteKind::Dynamic) => self.remove_route(&page.route),
            _ => {
                self.pages.remove(id);
                debug!(id = %page.id, path = %page.path, "page removed");
                Ok(())
            }
        }
    }

    /// Removes the page with the given path, if any. Returns whether a page
    /// was removed.
    pub fn remove_page_by_path(&mut self, path: &str) -> Result<bool> {
        let path = normalize_path(path);
        match self.pages.get_by_path(&path).map(|page| page.id.clone()) {
            Some(id) => {
                self.remove_page(&id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes every route bound to `component`, cascading to their pages.
    /// Returns the number of routes removed.
    pub fn remove_pages_by_component(&mut self, component: &Path) -> Result<usize> {
        let ids = self.routes.ids_by_component(component);
        let count = ids.len();
        for id in ids {
            self.remove_route(&id)?;
        }
        Ok(count)
    }

    /// Page by id.
    pub fn get_page(&self, id: &str) -> Option<Page> {
        self.pages.get(id).cloned()
    }

    /// Page by exact (normalized) path.
    pub fn get_page_by_path(&self, path: &str) -> Option<Page> {
        self.pages.get_by_path(&normalize_path(path)).cloned()
    }

    /// Snapshot of all pages.
    pub fn pages(&self) -> Vec<Page> {
        self.pages.iter().cloned().collect()
    }

    /// Number of stored pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    // ─── matching ────────────────────────────────────────────────────────────

    /// Resolves a request path to a route and its decoded parameters.
    ///
    /// An exact path-index hit wins outright; otherwise every route is
    /// tested in descending priority order. The linear scan is acceptable:
    /// route tables are small and the priority order must be respected
    /// exactly.
    pub fn get_match(&mut self, path: &str) -> Option<Match> {
        if let Some(route) = self.routes.get_by_path(path).cloned() {
            let params = route.internal.pattern.params(path).unwrap_or_default();
            return Some(Match { route, params });
        }

        let ordered: Vec<String> = self.routes.ordered_ids().to_vec();
        for id in ordered {
            let Some(route) = self.routes.get(&id) else {
                continue;
            };
            if let Some(params) = route.internal.pattern.params(path) {
                return Some(Match {
                    route: route.clone(),
                    params,
                });
            }
        }

        None
    }

    // ─── caches and watching ─────────────────────────────────────────────────

    /// Drops every cached parse.
    pub fn clear_cache(&mut self) {
        self.component_cache.clear();
        self.query_cache.clear();
    }

    /// Drops the cached parses for one component.
    ///
    /// Must run before recomputing anything for a changed component so no
    /// reader observes a parse older than the file content.
    pub fn clear_component_cache(&mut self, component: &Path) {
        self.component_cache.remove(component);
        self.query_cache.remove(component);
    }

    /// Number of watched component files.
    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    /// True when the component file is being watched.
    pub fn is_watching(&self, component: &Path) -> bool {
        self.watched.contains(component)
    }

    // ─── internals ───────────────────────────────────────────────────────────

    fn build_route(&mut self, input: RouteInput, meta: RecordMeta) -> Result<Route> {
        let component = input.component;
        let spec = self.parse_component(&component)?;
        let document = match &spec.query_source {
            Some(source) => Some(self.parse_query(source, &component)?),
            None => None,
        };
        let is_paginated = document.as_ref().is_some_and(|d| d.is_paginated);

        let original_path = normalize_path(&input.path);
        let kind = RouteKind::of(&original_path);
        let id = input
            .id
            .unwrap_or_else(|| hash::route_id(&original_path));

        let name = input.name.or_else(|| match kind {
            RouteKind::Dynamic => Some(format!("__{}", hash::snake_case(&original_path))),
            RouteKind::Static => None,
        });

        // Paginated queries get an optional numeric trailing segment,
        // respecting a pre-existing trailing slash.
        let path = if is_paginated {
            if original_path.ends_with('/') {
                format!("{original_path}:page(\\d+)?/")
            } else {
                format!("{original_path}/:page(\\d+)?")
            }
        } else {
            original_path.clone()
        };

        let pattern = RoutePattern::compile(&path)?;
        let priority = resolve_priority(&original_path);

        Ok(Route {
            id,
            kind,
            name,
            path,
            component,
            internal: RouteInternal {
                path: original_path,
                priority,
                pattern,
                query: RouteQuery {
                    source: spec.query_source.clone(),
                    document,
                    is_paginated,
                },
                meta: input.meta.unwrap_or_default(),
                record: meta,
            },
            seq: 0,
        })
    }

    fn parse_component(&mut self, component: &Path) -> Result<Arc<ComponentSpec>> {
        if let Some(cached) = self.component_cache.get(component) {
            return Ok(cached);
        }

        let extension = component
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let spec = if self.parse_hooks.has(extension) {
            let source = fs::read_to_string(component).map_err(|err| PagesError::Component {
                path: component.to_path_buf(),
                source: err,
            })?;
            self.parse_hooks
                .parse(extension, &source, component)
                .unwrap_or_default()
        } else {
            ComponentSpec::default()
        };

        let spec = Arc::new(spec);
        self.component_cache
            .put(component.to_path_buf(), Arc::clone(&spec));
        Ok(spec)
    }

    fn parse_query(&mut self, source: &str, component: &Path) -> Result<Arc<ParsedQuery>> {
        if let Some(cached) = self.query_cache.get(component) {
            return Ok(cached);
        }

        let parsed = Arc::new(self.engine.compile(source, component)?);
        self.query_cache
            .put(component.to_path_buf(), Arc::clone(&parsed));
        Ok(parsed)
    }

    fn watch_component(&mut self, component: PathBuf) {
        if self.watched.insert(component.clone()) {
            debug!(component = %component.display(), "watching component");
        }
    }

    fn unwatch_component(&mut self, component: &Path) {
        if !self.routes.references_component(component) && self.watched.remove(component) {
            debug!(component = %component.display(), "component unwatched");
        }
    }

    /// Removes a single page record without the dynamic-route cascade.
    ///
    /// Used by the garbage collector, which handles stale routes itself.
    pub(crate) fn remove_page_record(&mut self, id: &str) -> Option<Page> {
        self.pages.remove(id)
    }

    pub(crate) fn route_table(&self) -> &RouteTable {
        &self.routes
    }

    pub(crate) fn page_table(&self) -> &PageTable {
        &self.pages
    }

    fn emit(&self, event: TableEvent) {
        if let Some(sink) = &self.events {
            let _ = sink.send(event);
        }
    }
}

/// A mutable view scoped to one route.
pub struct RouteHandle<'a> {
    pages: &'a mut Pages,
    id: String,
}

impl RouteHandle<'_> {
    /// The route's id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The current route record.
    pub fn record(&self) -> Option<Route> {
        self.pages.get_route(&self.id)
    }

    /// Pages bound to this route.
    pub fn pages(&self) -> Vec<Page> {
        self.pages
            .page_table()
            .by_route(&self.id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Adds (or replaces) a page on this route.
    pub fn add_page(&mut self, input: PageInput, meta: RecordMeta) -> Result<Page> {
        self.pages.add_page(&self.id, input, meta)
    }

    /// Replaces an existing page on this route; fails with
    /// [`PagesError::NotFound`] when it does not exist.
    pub fn update_page(&mut self, input: PageInput, meta: RecordMeta) -> Result<Page> {
        let path = normalize_path(&input.path);
        let id = input
            .id
            .clone()
            .unwrap_or_else(|| hash::page_id(&path));
        if self.pages.page_table().get(&id).is_none() {
            return Err(PagesError::NotFound {
                id,
                path: Some(path),
            });
        }
        self.pages.add_page(&self.id, input, meta)
    }

    /// Removes a page bound to this route.
    pub fn remove_page(&mut self, page_id: &str) -> Result<()> {
        match self.pages.page_table().get(page_id) {
            Some(page) if page.route == self.id => self.pages.remove_page(page_id),
            _ => Err(PagesError::not_found(page_id)),
        }
    }
}

fn validate_route_input(input: &RouteInput) -> Result<()> {
    if input.path.is_empty() {
        return Err(PagesError::Validation("route path is required".into()));
    }
    if !input.path.starts_with('/') {
        return Err(PagesError::Validation(format!(
            "route path must start with a slash: {}",
            input.path
        )));
    }
    if input.component.as_os_str().is_empty() {
        return Err(PagesError::Validation("route component is required".into()));
    }
    Ok(())
}

fn validate_page_input(input: &CreatePageInput) -> Result<()> {
    if input.path.is_empty() {
        return Err(PagesError::Validation("page path is required".into()));
    }
    if !input.path.starts_with('/') {
        return Err(PagesError::Validation(format!(
            "page path must start with a slash: {}",
            input.path
        )));
    }
    if input.component.as_os_str().is_empty() {
        return Err(PagesError::Validation("page component is required".into()));
    }
    Ok(())
}
