//! Extension-point pipelines for the pages core.
//!
//! Plugin code customizes route and page creation through an explicit,
//! ordered pipeline rather than implicit event dispatch: transforms run in
//! registration order and each may rewrite the pending value or veto the
//! operation outright. Component parsing uses a separate per-extension map
//! where the registered hook for a file extension produces the parse result.

use std::collections::HashMap;
use std::path::Path;

use crate::query::ComponentSpec;

/// Outcome of one pipeline transform.
pub enum Flow<T> {
    /// Pass the (possibly rewritten) value to the next transform.
    Continue(T),
    /// Abort the pending operation.
    Veto,
}

type Transform<T> = Box<dyn Fn(T) -> Flow<T> + Send + Sync>;

/// An ordered list of transforms applied to a pending value.
///
/// The waterfall shape of tapable's `SyncWaterfallHook`: each transform
/// receives the previous transform's output.
pub struct Waterfall<T> {
    transforms: Vec<Transform<T>>,
}

impl<T> Waterfall<T> {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Appends a transform. Transforms run in registration order.
    pub fn tap<F>(&mut self, transform: F)
    where
        F: Fn(T) -> Flow<T> + Send + Sync + 'static,
    {
        self.transforms.push(Box::new(transform));
    }

    /// Threads `value` through every transform.
    ///
    /// Returns `None` when any transform vetoes.
    pub fn call(&self, value: T) -> Option<T> {
        let mut current = value;
        for transform in &self.transforms {
            match transform(current) {
                Flow::Continue(next) => current = next,
                Flow::Veto => return None,
            }
        }
        Some(current)
    }

    /// Number of registered transforms.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// True when no transform is registered.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl<T> Default for Waterfall<T> {
    fn default() -> Self {
        Self::new()
    }
}

type ParseFn = Box<dyn Fn(&str, &Path) -> ComponentSpec + Send + Sync>;

/// Per-extension component parse hooks.
///
/// Keyed by file extension without the leading dot (`vue`, `jsx`, ...).
/// At most one hook per extension; components with no registered hook parse
/// to an empty [`ComponentSpec`].
#[derive(Default)]
pub struct ParseHooks {
    hooks: HashMap<String, ParseFn>,
}

impl ParseHooks {
    /// Registers the parse hook for `extension`, replacing any previous one.
    pub fn register<F>(&mut self, extension: impl Into<String>, hook: F)
    where
        F: Fn(&str, &Path) -> ComponentSpec + Send + Sync + 'static,
    {
        self.hooks.insert(extension.into(), Box::new(hook));
    }

    /// Parses `source` with the hook registered for `extension`, if any.
    pub fn parse(&self, extension: &str, source: &str, resource: &Path) -> Option<ComponentSpec> {
        self.hooks.get(extension).map(|hook| hook(source, resource))
    }

    /// True when a hook is registered for `extension`.
    pub fn has(&self, extension: &str) -> bool {
        self.hooks.contains_key(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waterfall_runs_in_registration_order() {
        let mut pipeline: Waterfall<String> = Waterfall::new();
        pipeline.tap(|value| Flow::Continue(format!("{value}-a")));
        pipeline.tap(|value| Flow::Continue(format!("{value}-b")));

        assert_eq!(pipeline.call("x".to_string()), Some("x-a-b".to_string()));
    }

    #[test]
    fn waterfall_veto_aborts() {
        let mut pipeline: Waterfall<i32> = Waterfall::new();
        pipeline.tap(|value| Flow::Continue(value + 1));
        pipeline.tap(|_| Flow::Veto);
        pipeline.tap(|value| Flow::Continue(value + 100));

        assert_eq!(pipeline.call(1), None);
    }

    #[test]
    fn empty_waterfall_passes_value_through() {
        let pipeline: Waterfall<i32> = Waterfall::new();

        assert_eq!(pipeline.call(7), Some(7));
        assert!(pipeline.is_empty());
    }

    #[test]
    fn parse_hooks_dispatch_by_extension() {
        let mut hooks = ParseHooks::default();
        hooks.register("vue", |source, _| ComponentSpec {
            query_source: Some(source.to_string()),
            render_meta: Default::default(),
        });

        let spec = hooks
            .parse("vue", "query { posts }", Path::new("/site/Page.vue"))
            .unwrap();
        assert_eq!(spec.query_source.as_deref(), Some("query { posts }"));

        assert!(hooks.parse("jsx", "", Path::new("/site/Page.jsx")).is_none());
        assert!(hooks.has("vue"));
        assert!(!hooks.has("jsx"));
    }
}
