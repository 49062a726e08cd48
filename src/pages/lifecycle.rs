//! Rebuild cycles and generational garbage collection.
//!
//! Every rebuild bumps a generation counter and re-runs the registered
//! page-creation hooks against a [`PageScope`], which stamps new records with
//! the current generation. Managed hooks run only on the first cycle; their
//! records are exempt from sweeping and live until explicitly removed.
//!
//! After the hooks complete, a mark-and-sweep pass drops every unmanaged
//! record the hooks did not touch this cycle. Stale routes go first (taking
//! their pages with them), then stale pages; an unmanaged route losing its
//! last page is removed too.

use tracing::{debug, info};

use crate::error::Result;
use crate::pages::{CreatePageInput, Pages};
use crate::route::{RecordMeta, Route, RouteInput};
use crate::page::Page;

type Hook = Box<dyn Fn(&mut PageScope<'_>) -> Result<()> + Send + Sync>;

/// Outcome of one rebuild request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Generation of the last cycle that ran.
    pub generation: u64,
    /// Routes swept (including cascades from emptied routes).
    pub routes_removed: usize,
    /// Pages swept.
    pub pages_removed: usize,
    /// Cycles this request ran: one, plus one per hook-queued re-run.
    pub cycles: u32,
}

/// Drives rebuild cycles over a [`Pages`] façade.
pub struct PhaseRunner {
    generation: u64,
    bootstrapped: bool,
    pending: bool,
    create_hooks: Vec<Hook>,
    managed_hooks: Vec<Hook>,
}

impl Default for PhaseRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseRunner {
    /// Creates a runner with no hooks registered.
    pub fn new() -> Self {
        Self {
            generation: 0,
            bootstrapped: false,
            pending: false,
            create_hooks: Vec::new(),
            managed_hooks: Vec::new(),
        }
    }

    /// Registers a hook that runs every rebuild cycle. Records it creates
    /// are unmanaged and must be recreated each cycle to survive the sweep.
    pub fn on_create_pages<F>(&mut self, hook: F)
    where
        F: Fn(&mut PageScope<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.create_hooks.push(Box::new(hook));
    }

    /// Registers a hook that runs on the first cycle only. Records it
    /// creates are managed and survive every sweep.
    pub fn on_create_managed_pages<F>(&mut self, hook: F)
    where
        F: Fn(&mut PageScope<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.managed_hooks.push(Box::new(hook));
    }

    /// The generation of the most recent completed (or running) cycle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the first cycle has completed.
    pub fn bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    /// Runs rebuild cycles until quiescent: hooks, then the sweep.
    ///
    /// A re-run queued mid-cycle (via [`PageScope::request_rebuild`]) runs
    /// exactly once behind the current cycle; repeated requests within one
    /// cycle coalesce.
    pub fn rebuild(&mut self, pages: &mut Pages) -> Result<CycleReport> {
        let mut cycles = 0u32;
        loop {
            let mut report = self.run_cycle(pages)?;
            cycles += 1;
            if self.pending {
                self.pending = false;
                debug!("re-run queued during cycle, rebuilding again");
                continue;
            }
            report.cycles = cycles;
            return Ok(report);
        }
    }

    fn run_cycle(&mut self, pages: &mut Pages) -> Result<CycleReport> {
        self.generation += 1;
        let generation = self.generation;

        if !self.bootstrapped {
            for hook in &self.managed_hooks {
                let mut scope = PageScope {
                    pages: &mut *pages,
                    meta: RecordMeta::managed(generation),
                    rerun: &mut self.pending,
                };
                hook(&mut scope)?;
            }
        }

        for hook in &self.create_hooks {
            let mut scope = PageScope {
                pages: &mut *pages,
                meta: RecordMeta::unmanaged(generation),
                rerun: &mut self.pending,
            };
            hook(&mut scope)?;
        }

        let (routes_removed, pages_removed) = sweep(pages, generation)?;
        self.bootstrapped = true;

        info!(
            generation,
            routes = pages.route_count(),
            pages = pages.page_count(),
            routes_removed,
            pages_removed,
            "rebuild cycle complete"
        );

        Ok(CycleReport {
            generation,
            routes_removed,
            pages_removed,
            cycles: 1,
        })
    }
}

/// Removes every unmanaged record whose generation predates `generation`.
fn sweep(pages: &mut Pages, generation: u64) -> Result<(usize, usize)> {
    let mut routes_removed = 0;
    let mut pages_removed = 0;

    let stale_routes: Vec<String> = pages
        .route_table()
        .iter()
        .filter(|route| !route.is_managed() && route.internal.record.generation < generation)
        .map(|route| route.id.clone())
        .collect();

    for id in stale_routes {
        let cascading = pages.page_table().count_by_route(&id);
        pages.remove_route(&id)?;
        routes_removed += 1;
        pages_removed += cascading;
    }

    let stale_pages: Vec<(String, String)> = pages
        .page_table()
        .iter()
        .filter(|page| {
            !page.internal.record.is_managed && page.internal.record.generation < generation
        })
        .map(|page| (page.id.clone(), page.route.clone()))
        .collect();

    for (id, route_id) in stale_pages {
        if pages.page_table().get(&id).is_none() {
            continue;
        }

        let last_page = pages.page_table().count_by_route(&route_id) == 1;
        let route_unmanaged = pages
            .get_route(&route_id)
            .map(|route| !route.is_managed())
            .unwrap_or(false);

        if last_page && route_unmanaged {
            pages.remove_route(&route_id)?;
            routes_removed += 1;
            pages_removed += 1;
        } else if pages.remove_page_record(&id).is_some() {
            debug!(id = %id, "stale page swept");
            pages_removed += 1;
        }
    }

    Ok((routes_removed, pages_removed))
}

/// The mutation surface handed to page-creation hooks.
///
/// Every record created through the scope carries the cycle's generation
/// stamp and the scope's managed flag, so the sweep can tell recreated
/// records from abandoned ones.
pub struct PageScope<'a> {
    pages: &'a mut Pages,
    meta: RecordMeta,
    rerun: &'a mut bool,
}

impl PageScope<'_> {
    /// The generation this scope stamps onto records.
    pub fn generation(&self) -> u64 {
        self.meta.generation
    }

    /// Queues one follow-up cycle behind the current one. Repeated calls
    /// within a cycle coalesce.
    pub fn request_rebuild(&mut self) {
        *self.rerun = true;
    }

    /// True for scopes handed to managed hooks.
    pub fn is_managed(&self) -> bool {
        self.meta.is_managed
    }

    /// Creates a page (and its route) stamped with this scope's meta.
    pub fn create_page(&mut self, input: CreatePageInput) -> Result<Page> {
        self.pages.create_page(input, self.meta)
    }

    /// Replaces an existing page.
    pub fn update_page(&mut self, input: CreatePageInput) -> Result<Page> {
        self.pages.update_page(input, self.meta)
    }

    /// Creates a route stamped with this scope's meta.
    pub fn create_route(&mut self, input: RouteInput) -> Result<Route> {
        self.pages.create_route(input, self.meta)
    }

    /// Removes a page (dynamic routes go with their page).
    pub fn remove_page(&mut self, id: &str) -> Result<()> {
        self.pages.remove_page(id)
    }

    /// Removes the page at `path` if one exists.
    pub fn remove_page_by_path(&mut self, path: &str) -> Result<bool> {
        self.pages.remove_page_by_path(path)
    }

    /// Read access to the underlying façade.
    pub fn pages(&self) -> &Pages {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PagesConfig;
    use crate::error::PagesError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn pages() -> Pages {
        Pages::new(PagesConfig::default())
    }

    #[test]
    fn managed_hooks_run_on_first_cycle_only() {
        let mut runner = PhaseRunner::new();
        let mut pages = pages();

        let managed_runs = Arc::new(AtomicUsize::new(0));
        let create_runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&managed_runs);
        runner.on_create_managed_pages(move |scope: &mut PageScope<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            scope.create_page(CreatePageInput::new("/managed", "/site/M.vue"))?;
            Ok(())
        });

        let counter = Arc::clone(&create_runs);
        runner.on_create_pages(move |scope: &mut PageScope<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            scope.create_page(CreatePageInput::new("/plain", "/site/P.vue"))?;
            Ok(())
        });

        runner.rebuild(&mut pages).unwrap();
        runner.rebuild(&mut pages).unwrap();
        runner.rebuild(&mut pages).unwrap();

        assert_eq!(managed_runs.load(Ordering::SeqCst), 1);
        assert_eq!(create_runs.load(Ordering::SeqCst), 3);
        assert_eq!(runner.generation(), 3);
        assert!(runner.bootstrapped());
    }

    #[test]
    fn sweep_drops_pages_not_recreated() {
        let mut runner = PhaseRunner::new();
        let mut pages = pages();

        // First cycle creates two pages; later cycles only recreate one.
        let cycles = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cycles);
        runner.on_create_pages(move |scope: &mut PageScope<'_>| {
            scope.create_page(CreatePageInput::new("/keep", "/site/Keep.vue"))?;
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                scope.create_page(CreatePageInput::new("/drop", "/site/Drop.vue"))?;
            }
            Ok(())
        });

        let first = runner.rebuild(&mut pages).unwrap();
        assert_eq!(first.pages_removed, 0);
        assert_eq!(pages.page_count(), 2);

        let second = runner.rebuild(&mut pages).unwrap();
        assert_eq!(pages.page_count(), 1);
        assert!(pages.get_page_by_path("/keep").is_some());
        assert!(pages.get_page_by_path("/drop").is_none());
        // The emptied unmanaged route goes with its last page.
        assert_eq!(second.routes_removed, 1);
        assert!(!pages.is_watching(std::path::Path::new("/site/Drop.vue")));
    }

    #[test]
    fn managed_records_survive_sweeps() {
        let mut runner = PhaseRunner::new();
        let mut pages = pages();

        runner.on_create_managed_pages(|scope: &mut PageScope<'_>| {
            scope.create_page(CreatePageInput::new("/managed", "/site/M.vue"))?;
            Ok(())
        });

        runner.rebuild(&mut pages).unwrap();
        runner.rebuild(&mut pages).unwrap();
        runner.rebuild(&mut pages).unwrap();

        assert_eq!(pages.page_count(), 1);
        assert!(pages.get_page_by_path("/managed").is_some());
    }

    #[test]
    fn stale_dynamic_routes_are_swept() {
        let mut runner = PhaseRunner::new();
        let mut pages = pages();

        let cycles = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cycles);
        runner.on_create_pages(move |scope: &mut PageScope<'_>| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                scope.create_route(RouteInput::new("/user/:id", "/site/User.vue"))?;
            }
            Ok(())
        });

        runner.rebuild(&mut pages).unwrap();
        assert_eq!(pages.route_count(), 1);

        runner.rebuild(&mut pages).unwrap();
        assert_eq!(pages.route_count(), 0);
        assert_eq!(pages.watched_count(), 0);
    }

    #[test]
    fn requested_rebuild_runs_one_extra_cycle() {
        let mut runner = PhaseRunner::new();
        let mut pages = pages();

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        runner.on_create_pages(move |scope: &mut PageScope<'_>| {
            scope.create_page(CreatePageInput::new("/page", "/site/Page.vue"))?;
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                // Repeated requests within one cycle coalesce.
                scope.request_rebuild();
                scope.request_rebuild();
            }
            Ok(())
        });

        let report = runner.rebuild(&mut pages).unwrap();

        assert_eq!(report.cycles, 2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(runner.generation(), 2);
        assert_eq!(pages.page_count(), 1);
    }

    #[test]
    fn hook_errors_propagate() {
        let mut runner = PhaseRunner::new();
        let mut pages = pages();

        runner.on_create_pages(|_: &mut PageScope<'_>| Err(PagesError::Validation("boom".into())));

        let err = runner.rebuild(&mut pages).unwrap_err();
        assert!(matches!(err, PagesError::Validation(_)));
        assert!(!runner.bootstrapped());

        // A later successful registration set can still run.
        let mut runner = PhaseRunner::new();
        runner.on_create_pages(|scope: &mut PageScope<'_>| {
            scope.create_page(CreatePageInput::new("/ok", "/site/Ok.vue"))?;
            Ok(())
        });
        runner.rebuild(&mut pages).unwrap();
        assert!(pages.get_page_by_path("/ok").is_some());
    }
}
