//! Configuration for the pages core.
//!
//! Pure data with documented defaults; callers override via `with_*`
//! builders. There is no config file: the pages core is embedded by a build
//! layer that owns its own configuration surface.

use std::time::Duration;

/// Default capacity for the parsed-component cache.
pub const DEFAULT_COMPONENT_CACHE_SIZE: usize = 100;

/// Default capacity for the parsed-query cache.
pub const DEFAULT_QUERY_CACHE_SIZE: usize = 100;

/// Default coalescing window for change-triggered rebuild actions.
///
/// Rapid triggers within this window collapse into one downstream action.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(16);

/// Configuration for [`Pages`](crate::pages::Pages) and the watch coordinator.
#[derive(Debug, Clone)]
pub struct PagesConfig {
    /// Maximum number of parsed component descriptors kept in memory.
    pub component_cache_size: usize,

    /// Maximum number of parsed query descriptors kept in memory.
    pub query_cache_size: usize,

    /// Quiet period required before a debounced rebuild action fires.
    pub debounce_window: Duration,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            component_cache_size: DEFAULT_COMPONENT_CACHE_SIZE,
            query_cache_size: DEFAULT_QUERY_CACHE_SIZE,
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
        }
    }
}

impl PagesConfig {
    /// Sets the component cache capacity. Clamped to at least one entry.
    pub fn with_component_cache_size(mut self, size: usize) -> Self {
        self.component_cache_size = size.max(1);
        self
    }

    /// Sets the query cache capacity. Clamped to at least one entry.
    pub fn with_query_cache_size(mut self, size: usize) -> Self {
        self.query_cache_size = size.max(1);
        self
    }

    /// Sets the debounce window for rebuild actions.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }
}
