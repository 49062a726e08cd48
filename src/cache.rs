//! Bounded memoization caches for parsed components and queries.
//!
//! Both caches are keyed by component identity (the component's path).
//! Entries are invalidated only when that component's file content changes;
//! mutation of unrelated data never touches them. The correctness property
//! is "never serve a cached parse for content newer than the cache entry",
//! which the façade upholds by invalidating synchronously before any
//! recompute of a changed component.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use tracing::debug;

use crate::query::{ComponentSpec, ParsedQuery};

/// An LRU map from component path to a parsed descriptor.
///
/// Thin wrapper that tracks hit/miss counts for diagnostics.
pub struct ComponentKeyedCache<V> {
    entries: LruCache<PathBuf, Arc<V>>,
    hits: u64,
    misses: u64,
}

impl<V> ComponentKeyedCache<V> {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the cached value for `component`, marking it recently used.
    pub fn get(&mut self, component: &Path) -> Option<Arc<V>> {
        match self.entries.get(component) {
            Some(value) => {
                self.hits += 1;
                Some(Arc::clone(value))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores a value for `component`, evicting the least recently used
    /// entry when full.
    pub fn put(&mut self, component: PathBuf, value: Arc<V>) {
        self.entries.put(component, value);
    }

    /// Removes the entry for `component`. Missing entries are a no-op.
    pub fn remove(&mut self, component: &Path) {
        if self.entries.pop(component).is_some() {
            debug!(component = %component.display(), "cache entry invalidated");
        }
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) counters since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// Cache of parsed component descriptors.
pub type ComponentCache = ComponentKeyedCache<ComponentSpec>;

/// Cache of compiled query descriptors.
pub type QueryCache = ComponentKeyedCache<ParsedQuery>;
