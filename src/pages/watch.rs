//! Development-mode watching: coalesced, debounced reactions to change.
//!
//! The coordinator consumes two streams: [`TableEvent`]s emitted by the
//! [`Pages`] façade and [`ChangeEvent`]s pushed by the embedding build layer
//! (store updates, component file edits). Events are folded into the
//! cheapest sufficient [`RebuildAction`] and debounced over a short window
//! so bursts collapse into one reaction.
//!
//! # Architecture
//!
//! ```text
//! Pages ──TableEvent──▶ ┌─────────────────┐
//!                       │ WatchCoordinator │──RebuildAction──▶ build layer
//! WatchHandle ─Change──▶ └─────────────────┘
//!                               │
//!                        PhaseRunner (RebuildPages runs in-loop)
//! ```
//!
//! Component edits are the exception to debouncing: the affected routes are
//! re-parsed immediately so the table never serves a stale query, and the
//! resulting table events then debounce as usual.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::pages::{Pages, PhaseRunner, TableEvent};
use crate::route::RouteInput;

/// A coalesced reaction published to the build layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildAction {
    /// Re-run the page-creation hooks (the store changed).
    RebuildPages,
    /// The route structure changed; the router output must be regenerated.
    GenerateRoutes,
    /// Route structure is intact but page data went stale; re-run queries.
    RefetchQueries,
}

/// External change notifications pushed into the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The content store changed.
    StoreChanged,
    /// A watched component file changed on disk.
    ComponentChanged(PathBuf),
}

/// Cloneable front for pushing changes and shutting the coordinator down.
#[derive(Clone)]
pub struct WatchHandle {
    changes: UnboundedSender<ChangeEvent>,
    cancel: CancellationToken,
}

impl WatchHandle {
    /// Signals that the content store changed.
    pub fn notify_store_changed(&self) {
        let _ = self.changes.send(ChangeEvent::StoreChanged);
    }

    /// Signals that a component file changed on disk.
    pub fn notify_component_changed(&self, component: impl Into<PathBuf>) {
        let _ = self
            .changes
            .send(ChangeEvent::ComponentChanged(component.into()));
    }

    /// Requests coordinator shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Per-action debounce deadlines.
#[derive(Debug, Default)]
struct Debounce {
    rebuild_pages: Option<Instant>,
    generate_routes: Option<Instant>,
    refetch_queries: Option<Instant>,
}

impl Debounce {
    fn schedule(&mut self, action: RebuildAction, deadline: Instant) {
        let slot = match action {
            RebuildAction::RebuildPages => &mut self.rebuild_pages,
            RebuildAction::GenerateRoutes => &mut self.generate_routes,
            RebuildAction::RefetchQueries => &mut self.refetch_queries,
        };
        // Later events within the window extend the deadline.
        *slot = Some(deadline);
    }

    fn next_deadline(&self) -> Option<Instant> {
        [self.rebuild_pages, self.generate_routes, self.refetch_queries]
            .into_iter()
            .flatten()
            .min()
    }

    fn take_due(&mut self, now: Instant) -> Vec<RebuildAction> {
        let mut due = Vec::new();
        if self.rebuild_pages.is_some_and(|d| d <= now) {
            self.rebuild_pages = None;
            due.push(RebuildAction::RebuildPages);
        }
        if self.generate_routes.is_some_and(|d| d <= now) {
            self.generate_routes = None;
            due.push(RebuildAction::GenerateRoutes);
        }
        if self.refetch_queries.is_some_and(|d| d <= now) {
            self.refetch_queries = None;
            due.push(RebuildAction::RefetchQueries);
        }
        due
    }
}

/// Drives the watch loop over a shared [`Pages`] façade.
pub struct WatchCoordinator {
    pages: Arc<Mutex<Pages>>,
    runner: PhaseRunner,
    table_events: UnboundedReceiver<TableEvent>,
    changes: UnboundedReceiver<ChangeEvent>,
    actions: UnboundedSender<RebuildAction>,
    cancel: CancellationToken,
    debounce: Debounce,
}

impl WatchCoordinator {
    /// Wires a coordinator to the façade and returns it with its handle.
    ///
    /// The façade's event sink is replaced; coalesced [`RebuildAction`]s are
    /// published to `actions`.
    pub fn new(
        pages: Arc<Mutex<Pages>>,
        runner: PhaseRunner,
        actions: UnboundedSender<RebuildAction>,
    ) -> (Self, WatchHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        lock(&pages).set_event_sink(event_tx);

        let coordinator = Self {
            pages,
            runner,
            table_events: event_rx,
            changes: change_rx,
            actions,
            cancel: cancel.clone(),
            debounce: Debounce::default(),
        };
        let handle = WatchHandle {
            changes: change_tx,
            cancel,
        };
        (coordinator, handle)
    }

    /// Runs the initial rebuild, then watches until shutdown.
    pub async fn run(mut self) {
        if !self.runner.bootstrapped() {
            let result = {
                let mut pages = lock(&self.pages);
                self.runner.rebuild(&mut pages)
            };
            match result {
                Ok(report) => debug!(generation = report.generation, "bootstrap rebuild complete"),
                Err(err) => error!(error = %err, "bootstrap rebuild failed"),
            }
        }

        // Table events emitted during bootstrap predate watching.
        while self.table_events.try_recv().is_ok() {}

        loop {
            let next = self.debounce.next_deadline();

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("watch coordinator shutting down");
                    break;
                }

                Some(event) = self.table_events.recv() => {
                    self.on_table_event(event);
                }

                Some(change) = self.changes.recv() => {
                    self.on_change(change);
                }

                _ = wait_until(next) => {
                    self.flush_due();
                }
            }
        }
    }

    fn on_table_event(&mut self, event: TableEvent) {
        let action = match event {
            TableEvent::RouteInserted { .. } | TableEvent::RouteRemoved { .. } => {
                RebuildAction::GenerateRoutes
            }
            TableEvent::RouteUpdated { path_changed, .. } => {
                if path_changed {
                    RebuildAction::GenerateRoutes
                } else {
                    RebuildAction::RefetchQueries
                }
            }
        };
        self.schedule(action);
    }

    fn on_change(&mut self, change: ChangeEvent) {
        match change {
            ChangeEvent::StoreChanged => self.schedule(RebuildAction::RebuildPages),
            ChangeEvent::ComponentChanged(component) => self.on_component_changed(component),
        }
    }

    /// Re-parses every route bound to a changed component immediately.
    fn on_component_changed(&mut self, component: PathBuf) {
        let mut pages = lock(&self.pages);

        if !pages.is_watching(&component) {
            debug!(component = %component.display(), "ignoring change to unwatched component");
            return;
        }

        pages.clear_component_cache(&component);

        for id in pages.route_table().ids_by_component(&component) {
            let Some(route) = pages.get_route(&id) else {
                continue;
            };
            let input = RouteInput {
                id: Some(route.id.clone()),
                path: route.internal.path.clone(),
                component: route.component.clone(),
                name: route.name.clone(),
                meta: Some(route.internal.meta.clone()),
            };
            if let Err(err) = pages.update_route(input, route.internal.record) {
                warn!(route = %id, error = %err, "failed to refresh route for changed component");
            }
        }
    }

    fn schedule(&mut self, action: RebuildAction) {
        let window = lock(&self.pages).config().debounce_window;
        self.debounce.schedule(action, Instant::now() + window);
    }

    fn flush_due(&mut self) {
        for action in self.debounce.take_due(Instant::now()) {
            if action == RebuildAction::RebuildPages {
                let result = {
                    let mut pages = lock(&self.pages);
                    self.runner.rebuild(&mut pages)
                };
                match result {
                    Ok(report) => debug!(
                        generation = report.generation,
                        routes_removed = report.routes_removed,
                        pages_removed = report.pages_removed,
                        "rebuild complete"
                    ),
                    Err(err) => {
                        error!(error = %err, "rebuild failed");
                        continue;
                    }
                }
                // Rebuild-driven table events are superseded by the actions
                // the rebuild itself schedules on the next loop turn.
            }
            debug!(?action, "publishing rebuild action");
            let _ = self.actions.send(action);
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn lock(pages: &Mutex<Pages>) -> std::sync::MutexGuard<'_, Pages> {
    pages.lock().unwrap_or_else(PoisonError::into_inner)
}
