//! In-memory route table with live indices.
//!
//! Hash indices on the unique `id` and `path` fields give O(1) lookups; a
//! descending-priority iteration view is recomputed lazily after mutations.
//! Uniqueness is enforced as an invariant on insert and upsert, not assumed.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{PagesError, Result};

use super::Route;

/// Indexed collection of [`Route`] records.
#[derive(Default)]
pub struct RouteTable {
    by_id: HashMap<String, Route>,
    by_path: HashMap<String, String>,
    ordered: Vec<String>,
    ordered_dirty: bool,
    next_seq: u64,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored routes.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when no routes are stored.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Route by id.
    pub fn get(&self, id: &str) -> Option<&Route> {
        self.by_id.get(id)
    }

    /// Route by exact path.
    pub fn get_by_path(&self, path: &str) -> Option<&Route> {
        self.by_path.get(path).and_then(|id| self.by_id.get(id))
    }

    /// Ids of all routes bound to `component`.
    pub fn ids_by_component(&self, component: &Path) -> Vec<String> {
        self.by_id
            .values()
            .filter(|route| route.component == component)
            .map(|route| route.id.clone())
            .collect()
    }

    /// True when any route references `component`.
    pub fn references_component(&self, component: &Path) -> bool {
        self.by_id.values().any(|route| route.component == component)
    }

    /// Inserts a new route or replaces the one with the same id.
    ///
    /// On replace, the stored route's storage identity (`seq`) is preserved
    /// so priority ties keep their original insertion order. Returns the
    /// effective stored route.
    ///
    /// Fails when another route already owns the path.
    pub fn upsert(&mut self, mut route: Route) -> Result<Route> {
        if let Some(owner) = self.by_path.get(&route.path) {
            if owner != &route.id {
                return Err(PagesError::Validation(format!(
                    "route path {} is already owned by another route",
                    route.path
                )));
            }
        }

        match self.by_id.remove(&route.id) {
            Some(existing) => {
                route.seq = existing.seq;
                self.by_path.remove(&existing.path);
            }
            None => {
                route.seq = self.next_seq;
                self.next_seq += 1;
            }
        }

        self.by_path.insert(route.path.clone(), route.id.clone());
        self.by_id.insert(route.id.clone(), route.clone());
        self.ordered_dirty = true;

        Ok(route)
    }

    /// Removes the route with the given id.
    pub fn remove(&mut self, id: &str) -> Option<Route> {
        let route = self.by_id.remove(id)?;
        self.by_path.remove(&route.path);
        self.ordered_dirty = true;
        Some(route)
    }

    /// All routes in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.by_id.values()
    }

    /// Route ids in descending priority order, ties by insertion order.
    ///
    /// The view is cached and recomputed only after mutations.
    pub fn ordered_ids(&mut self) -> &[String] {
        if self.ordered_dirty {
            let mut routes: Vec<(&String, i64, u64)> = self
                .by_id
                .values()
                .map(|route| (&route.id, route.internal.priority, route.seq))
                .collect();
            routes.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
            self.ordered = routes.into_iter().map(|(id, _, _)| id.clone()).collect();
            self.ordered_dirty = false;
        }
        &self.ordered
    }

    /// Snapshot of all routes in descending priority order.
    pub fn ordered(&mut self) -> Vec<Route> {
        self.ordered_ids();
        self.ordered
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::RoutePattern;
    use crate::route::{resolve_priority, RouteInternal, RouteKind, RouteQuery};
    use std::path::PathBuf;

    fn route(id: &str, path: &str) -> Route {
        Route {
            id: id.to_string(),
            kind: RouteKind::of(path),
            name: None,
            path: path.to_string(),
            component: PathBuf::from("/site/Page.vue"),
            internal: RouteInternal {
                path: path.to_string(),
                priority: resolve_priority(path),
                pattern: RoutePattern::compile(path).unwrap(),
                query: RouteQuery::default(),
                meta: Default::default(),
                record: Default::default(),
            },
            seq: 0,
        }
    }

    #[test]
    fn upsert_inserts_and_indexes() {
        let mut table = RouteTable::new();
        table.upsert(route("r1", "/a")).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("r1").unwrap().path, "/a");
        assert_eq!(table.get_by_path("/a").unwrap().id, "r1");
    }

    #[test]
    fn upsert_same_id_preserves_seq() {
        let mut table = RouteTable::new();
        let first = table.upsert(route("r1", "/a")).unwrap();
        table.upsert(route("r2", "/b")).unwrap();

        let replaced = table.upsert(route("r1", "/a")).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(replaced.seq, first.seq);
    }

    #[test]
    fn upsert_reindexes_a_changed_path() {
        let mut table = RouteTable::new();
        table.upsert(route("r1", "/a")).unwrap();
        table.upsert(route("r1", "/b")).unwrap();

        assert!(table.get_by_path("/a").is_none());
        assert_eq!(table.get_by_path("/b").unwrap().id, "r1");
    }

    #[test]
    fn upsert_rejects_duplicate_path() {
        let mut table = RouteTable::new();
        table.upsert(route("r1", "/a")).unwrap();

        let err = table.upsert(route("r2", "/a")).unwrap_err();
        assert!(matches!(err, PagesError::Validation(_)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_clears_both_indices() {
        let mut table = RouteTable::new();
        table.upsert(route("r1", "/a")).unwrap();

        assert!(table.remove("r1").is_some());
        assert!(table.get("r1").is_none());
        assert!(table.get_by_path("/a").is_none());
        assert!(table.remove("r1").is_none());
    }

    #[test]
    fn ordered_sorts_by_descending_priority() {
        let mut table = RouteTable::new();
        table.upsert(route("r1", "/a/:b")).unwrap();
        table.upsert(route("r2", "/a/b")).unwrap();
        table.upsert(route("r3", "/a/b/c")).unwrap();

        let paths: Vec<String> = table.ordered().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/a/b/c", "/a/b", "/a/:b"]);
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let mut table = RouteTable::new();
        table.upsert(route("r1", "/aa")).unwrap();
        table.upsert(route("r2", "/ab")).unwrap();
        table.upsert(route("r3", "/ac")).unwrap();

        // Re-upserting the first route must not move it.
        table.upsert(route("r1", "/aa")).unwrap();

        let ids: Vec<String> = table.ordered().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn ids_by_component_finds_all_bindings() {
        let mut table = RouteTable::new();
        table.upsert(route("r1", "/a")).unwrap();
        table.upsert(route("r2", "/b")).unwrap();

        let ids = table.ids_by_component(Path::new("/site/Page.vue"));
        assert_eq!(ids.len(), 2);
        assert!(table.references_component(Path::new("/site/Page.vue")));
        assert!(!table.references_component(Path::new("/site/Other.vue")));
    }
}
