//! In-memory page table with live indices.
//!
//! Same storage discipline as the route table: hash indices on unique `id`
//! and `path`, uniqueness enforced on insert and upsert.

use std::collections::HashMap;

use crate::error::{PagesError, Result};

use super::Page;

/// Indexed collection of [`Page`] records.
#[derive(Default)]
pub struct PageTable {
    by_id: HashMap<String, Page>,
    by_path: HashMap<String, String>,
    next_seq: u64,
}

impl PageTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pages.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when no pages are stored.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Page by id.
    pub fn get(&self, id: &str) -> Option<&Page> {
        self.by_id.get(id)
    }

    /// Page by exact path.
    pub fn get_by_path(&self, path: &str) -> Option<&Page> {
        self.by_path.get(path).and_then(|id| self.by_id.get(id))
    }

    /// All pages bound to the given route.
    pub fn by_route(&self, route_id: &str) -> Vec<&Page> {
        self.by_id
            .values()
            .filter(|page| page.route == route_id)
            .collect()
    }

    /// Number of pages bound to the given route.
    pub fn count_by_route(&self, route_id: &str) -> usize {
        self.by_id
            .values()
            .filter(|page| page.route == route_id)
            .count()
    }

    /// Inserts a new page or replaces the one with the same id, preserving
    /// storage identity. Fails when another page already owns the path.
    pub fn upsert(&mut self, mut page: Page) -> Result<Page> {
        if let Some(owner) = self.by_path.get(&page.path) {
            if owner != &page.id {
                return Err(PagesError::Validation(format!(
                    "page path {} is already owned by another page",
                    page.path
                )));
            }
        }

        match self.by_id.remove(&page.id) {
            Some(existing) => {
                page.seq = existing.seq;
                self.by_path.remove(&existing.path);
            }
            None => {
                page.seq = self.next_seq;
                self.next_seq += 1;
            }
        }

        self.by_path.insert(page.path.clone(), page.id.clone());
        self.by_id.insert(page.id.clone(), page.clone());

        Ok(page)
    }

    /// Removes the page with the given id.
    pub fn remove(&mut self, id: &str) -> Option<Page> {
        let page = self.by_id.remove(id)?;
        self.by_path.remove(&page.path);
        Some(page)
    }

    /// Removes every page bound to the given route, returning them.
    pub fn remove_by_route(&mut self, route_id: &str) -> Vec<Page> {
        let ids: Vec<String> = self
            .by_id
            .values()
            .filter(|page| page.route == route_id)
            .map(|page| page.id.clone())
            .collect();

        ids.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// All pages in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.by_id.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageInternal;
    use crate::query::PageQuery;

    fn page(id: &str, path: &str, route: &str) -> Page {
        Page {
            id: id.to_string(),
            path: path.to_string(),
            route: route.to_string(),
            context: Default::default(),
            internal: PageInternal {
                query: PageQuery::default(),
                is_dynamic: path.contains(':'),
                record: Default::default(),
            },
            seq: 0,
        }
    }

    #[test]
    fn upsert_and_lookup() {
        let mut table = PageTable::new();
        table.upsert(page("p1", "/a", "r1")).unwrap();

        assert_eq!(table.get("p1").unwrap().path, "/a");
        assert_eq!(table.get_by_path("/a").unwrap().id, "p1");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn upsert_same_id_preserves_seq() {
        let mut table = PageTable::new();
        let first = table.upsert(page("p1", "/a", "r1")).unwrap();
        table.upsert(page("p2", "/b", "r1")).unwrap();

        let replaced = table.upsert(page("p1", "/a", "r2")).unwrap();

        assert_eq!(replaced.seq, first.seq);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn upsert_rejects_duplicate_path() {
        let mut table = PageTable::new();
        table.upsert(page("p1", "/a", "r1")).unwrap();

        let err = table.upsert(page("p2", "/a", "r1")).unwrap_err();
        assert!(matches!(err, PagesError::Validation(_)));
    }

    #[test]
    fn remove_by_route_cascades() {
        let mut table = PageTable::new();
        table.upsert(page("p1", "/a", "r1")).unwrap();
        table.upsert(page("p2", "/b", "r1")).unwrap();
        table.upsert(page("p3", "/c", "r2")).unwrap();

        let removed = table.remove_by_route("r1");

        assert_eq!(removed.len(), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.count_by_route("r1"), 0);
        assert_eq!(table.count_by_route("r2"), 1);
    }
}
