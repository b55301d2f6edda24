//! The navigator: history, the navigation pipeline and dialog access.
//!
//! [`Navigator`] is a cheap, cloneable handle. It is `Rc`-based and therefore
//! neither `Send` nor `Sync`: every call happens on the thread that built it.
//! View-models receive a [`WeakNavigator`] so they can navigate or open
//! dialogs without keeping the navigator alive.
//!
//! # Pipeline
//!
//! Every entry point ([`navigate`](Navigator::navigate),
//! [`navigate_to`](Navigator::navigate_to), [`back`](Navigator::back),
//! [`forward`](Navigator::forward), [`refresh`](Navigator::refresh),
//! [`navigate_partial`](Navigator::navigate_partial)) feeds the same run:
//!
//! ```text
//! check ─▶ plan ─▶ navigating away ─▶ commit ─▶ navigating to ─▶ evict
//!          │        (cancellable)      │         (may redirect)
//!          │                           │              │
//!          │                           │              └─ redirect: plan again,
//!          │                           │                 replace in place
//!          │                           └─ activates the run; older runs
//!          │                              become Rerouted
//!          └─ RouteNotFound / RouteMismatch, nothing changed
//! ```
//!
//! The whole run is wrapped in one busy scope of the [`TaskRunner`].
//! While it runs, dialogs may only be opened through the presenter passed to
//! the lifecycle callbacks. Commit, materialization and attachment are
//! synchronous sections during which both navigation and dialogs are
//! blocked.

use crate::blocking::{Block, BlockingFlags};
#[cfg(feature = "cache")]
use crate::cache::CacheStats;
use crate::config::NavigatorConfig;
use crate::dialog::{
    DialogFrame, DialogPresenter, DialogRegistration, DialogRegistry, DialogResult, DialogStack,
    DialogSurface, NullSurface,
};
use crate::error::{NavigationError, NavigationResult, Result};
use crate::graph::RouteGraph;
use crate::item::{dispose_all, plan_items, select_evictions, EvictionPolicy, Materializer, RouteItem};
use crate::lifecycle::{NavigatedToArgs, NavigatingAwayArgs, NavigationAction, NavigationKind};
use crate::params::RouteParams;
use crate::route::{Location, Route, RouteDefinition, RouteDescriptor};
use crate::services::{NoServices, ServiceLookup};
use crate::state::{HistoryEntry, HistoryList, NavigationGeneration, NavigationTicket};
use crate::task::{BusyScope, LocalTaskRunner, TaskRunner};
use crate::view::{ContentSlot, NestedHost, ViewRegistration, ViewRegistry};
use crate::{debug_log, error_log, info_log, trace_log, warn_log};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Maximum redirect depth to prevent infinite redirect loops.
const MAX_REDIRECT_DEPTH: usize = 5;

// ============================================================================
// NavigationState
// ============================================================================

/// Phase of the navigation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationState {
    #[default]
    Idle,
    /// Asking the outgoing view-models whether they may be left.
    NavigatingAway,
    /// Updating the history.
    Committing,
    /// Materializing and notifying the incoming view-models.
    NavigatingTo,
}

// ============================================================================
// Requests and plans
// ============================================================================

#[derive(Debug, Clone)]
enum Request {
    Path(String),
    Descriptor(RouteDescriptor),
    Back,
    Forward,
    Refresh,
    Partial { depth: usize, path: String },
}

enum HistoryOp {
    Push,
    Replace,
    MoveTo(Rc<HistoryEntry>),
}

struct Plan {
    route: Route,
    items: Vec<Rc<RouteItem>>,
    /// Leading items shared with the current entry.
    prefix: usize,
    op: HistoryOp,
    kind: NavigationKind,
}

enum Away {
    Proceed,
    Cancelled(String),
    Redirect(String),
    Superseded,
}

enum Arrival {
    Complete,
    Redirect(String),
    Superseded,
}

// ============================================================================
// Navigator
// ============================================================================

struct NavigatorInner {
    config: NavigatorConfig,
    graph: RouteGraph,
    views: ViewRegistry,
    services: Rc<dyn ServiceLookup>,
    tasks: Rc<dyn TaskRunner>,
    root_host: Rc<dyn NestedHost>,
    dialogs: Rc<DialogStack>,
    flags: Rc<BlockingFlags>,
    history: RefCell<HistoryList>,
    generation: NavigationGeneration,
    /// Committed run still notifying its incoming view-models.
    in_flight: Cell<Option<NavigationTicket>>,
    running: Cell<usize>,
    state: Cell<NavigationState>,
    /// Entries dropped from the history and not yet swept by eviction.
    retired: RefCell<Vec<Rc<HistoryEntry>>>,
    this: WeakNavigator,
}

/// Handle to a navigator.
///
/// # Example
///
/// ```ignore
/// let navigator = Navigator::builder()
///     .view(ViewRegistration::new(|_| Ok(Shell), ShellView::new).hosting_children())
///     .view(ViewRegistration::new(|_| Ok(Home), HomeView::new))
///     .route(RouteDefinition::new::<Shell>(""))
///     .route(RouteDefinition::new::<Home>("home").child_of::<Shell>())
///     .build()?;
///
/// let result = navigator.navigate("/home").await?;
/// assert!(result.is_success());
/// ```
#[derive(Clone)]
pub struct Navigator {
    inner: Rc<NavigatorInner>,
}

/// Non-owning handle to a [`Navigator`].
#[derive(Clone, Default)]
pub struct WeakNavigator {
    inner: Weak<NavigatorInner>,
}

impl WeakNavigator {
    /// A handle that never upgrades.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upgrade(&self) -> Option<Navigator> {
        self.inner.upgrade().map(|inner| Navigator { inner })
    }
}

impl fmt::Debug for WeakNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakNavigator")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Navigator {
    pub fn builder() -> NavigatorBuilder {
        NavigatorBuilder::new()
    }

    pub fn downgrade(&self) -> WeakNavigator {
        self.inner.this.clone()
    }

    // ========================================================================
    // Navigation entry points
    // ========================================================================

    /// Navigate to a route string such as `/shell/items/42#comments`.
    pub async fn navigate(&self, path: &str) -> Result<NavigationResult> {
        self.run(Request::Path(path.to_string())).await
    }

    /// Navigate to a typed route.
    pub async fn navigate_to(&self, descriptor: RouteDescriptor) -> Result<NavigationResult> {
        self.run(Request::Descriptor(descriptor)).await
    }

    /// Step back one history entry.
    pub async fn back(&self) -> Result<NavigationResult> {
        self.run(Request::Back).await
    }

    /// Step forward one history entry.
    pub async fn forward(&self) -> Result<NavigationResult> {
        self.run(Request::Forward).await
    }

    /// Re-enter the current route with a freshly materialized leaf.
    pub async fn refresh(&self) -> Result<NavigationResult> {
        self.run(Request::Refresh).await
    }

    /// Replace everything below level `depth` of the current route.
    ///
    /// `relative` is matched against the children of the view-model shown
    /// at `depth`; levels `0..=depth` are kept.
    pub async fn navigate_partial(&self, depth: usize, relative: &str) -> Result<NavigationResult> {
        self.run(Request::Partial {
            depth,
            path: relative.to_string(),
        })
        .await
    }

    /// Start a navigation on the task runner without waiting for it.
    ///
    /// Fails when the task runner cannot schedule work, for example the
    /// default runner without an executor.
    pub fn spawn_navigate(&self, path: impl Into<String>) -> Result<()> {
        let navigator = self.clone();
        let path = path.into();
        self.inner.tasks.post(Box::pin(async move {
            match navigator.navigate(&path).await {
                Ok(result) => {
                    trace_log!("Posted navigation to '{}' finished: {:?}", path, result);
                }
                Err(err) => {
                    error_log!("Posted navigation to '{}' failed: {}", path, err);
                }
            }
        }))
    }

    // ========================================================================
    // Dialogs
    // ========================================================================

    /// Presenter owning the empty dialog stack.
    ///
    /// It refuses to open dialogs while a navigation is in flight; lifecycle
    /// callbacks use the presenter in their arguments instead.
    pub fn dialogs(&self) -> DialogPresenter {
        self.inner.dialogs.root_presenter()
    }

    /// Close `frame`, which must be the top dialog.
    pub fn close_dialog(&self, frame: &DialogFrame, result: DialogResult) -> Result<()> {
        self.inner.dialogs.close(frame, result)
    }

    /// Run the dismiss protocol on the top dialog.
    ///
    /// Returns `true` when the dialog was closed.
    pub async fn dismiss_top_dialog(&self) -> Result<bool> {
        let dialogs = Rc::clone(&self.inner.dialogs);
        dialogs.request_dismiss().await
    }

    /// React to an escape/back gesture by posting the dismiss protocol.
    ///
    /// Returns `false` when no dialog is shown, so the caller can treat the
    /// gesture as something else (a back navigation, say).
    pub fn handle_dismiss_gesture(&self) -> Result<bool> {
        if self.inner.dialogs.is_empty() {
            return Ok(false);
        }
        let navigator = self.clone();
        self.inner.tasks.post(Box::pin(async move {
            if let Err(err) = navigator.dismiss_top_dialog().await {
                error_log!("Dismissing the top dialog failed: {}", err);
            }
        }))?;
        Ok(true)
    }

    pub fn dialog_count(&self) -> usize {
        self.inner.dialogs.len()
    }

    pub fn top_dialog(&self) -> Option<DialogFrame> {
        self.inner.dialogs.top()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn current_entry(&self) -> Option<Rc<HistoryEntry>> {
        self.inner.history.borrow().current().cloned()
    }

    pub fn current_route(&self) -> Option<Route> {
        self.inner
            .history
            .borrow()
            .current()
            .map(|entry| entry.route().clone())
    }

    pub fn current_path(&self) -> Option<String> {
        self.inner
            .history
            .borrow()
            .current()
            .map(|entry| entry.path().to_string())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.inner.history.borrow().current_index()
    }

    /// Every history entry, oldest first.
    pub fn history(&self) -> Vec<Rc<HistoryEntry>> {
        self.inner.history.borrow().entries().to_vec()
    }

    pub fn history_len(&self) -> usize {
        self.inner.history.borrow().len()
    }

    pub fn can_go_back(&self) -> bool {
        self.inner.history.borrow().can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.inner.history.borrow().can_go_forward()
    }

    pub fn peek_back(&self) -> Option<Rc<HistoryEntry>> {
        self.inner.history.borrow().peek_back().cloned()
    }

    pub fn peek_forward(&self) -> Option<Rc<HistoryEntry>> {
        self.inner.history.borrow().peek_forward().cloned()
    }

    pub fn state(&self) -> NavigationState {
        self.inner.state.get()
    }

    pub fn is_navigating(&self) -> bool {
        self.inner.running.get() > 0
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.inner.config
    }

    pub fn graph(&self) -> &RouteGraph {
        &self.inner.graph
    }

    /// Surface showing the root view.
    pub fn root_host(&self) -> Rc<dyn NestedHost> {
        Rc::clone(&self.inner.root_host)
    }

    /// Statistics of the resolution cache, if enabled.
    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.inner.graph.cache_stats()
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    async fn run(&self, request: Request) -> Result<NavigationResult> {
        let inner = &*self.inner;
        inner.ensure_can_navigate()?;
        let _busy = BusyScope::enter(&*inner.tasks);
        let ticket = inner.generation.issue();
        let _run = RunScope::enter(inner, ticket);
        let _in_flight = inner.flags.block(Block::Run);
        debug_log!("Navigation {:?} started: {:?}", ticket, request);

        let mut request = request;
        let mut continuation = false;
        let mut redirects = 0;
        let mut departed: Option<Option<Rc<HistoryEntry>>> = None;

        loop {
            let plan = inner.plan(&request, continuation)?;
            info_log!(
                "Navigation {:?}: '{}' → '{}'",
                plan.kind,
                inner.current_path().unwrap_or_default(),
                plan.route.path()
            );

            if !continuation {
                inner.state.set(NavigationState::NavigatingAway);
                match inner.navigate_away(&plan, ticket).await? {
                    Away::Proceed => {}
                    Away::Cancelled(reason) => {
                        info_log!("Navigation to '{}' cancelled: {}", plan.route.path(), reason);
                        return Ok(NavigationResult::Cancelled { reason });
                    }
                    Away::Redirect(to) => {
                        redirects += 1;
                        check_redirect_depth(redirects, &to)?;
                        debug_log!("Redirecting from '{}' to '{}'", plan.route.path(), to);
                        request = Request::Path(to);
                        continue;
                    }
                    Away::Superseded => {
                        info_log!("Navigation to '{}' rerouted", plan.route.path());
                        return Ok(NavigationResult::Rerouted);
                    }
                }
            }

            let Some((entry, left)) = inner.commit(&plan, ticket, continuation)? else {
                info_log!("Navigation to '{}' rerouted before commit", plan.route.path());
                return Ok(NavigationResult::Rerouted);
            };
            departed.get_or_insert(left);

            inner.state.set(NavigationState::NavigatingTo);
            match inner.navigate_to(&plan, &entry, ticket).await? {
                Arrival::Complete => {
                    inner.finish(&entry, departed.flatten().as_ref());
                    info_log!(
                        "Navigation complete: '{}' (depth {}, history {})",
                        entry.path(),
                        entry.route().depth(),
                        inner.history.borrow().len()
                    );
                    return Ok(NavigationResult::Success {
                        path: entry.path().to_string(),
                    });
                }
                Arrival::Redirect(to) => {
                    redirects += 1;
                    check_redirect_depth(redirects, &to)?;
                    debug_log!("'{}' redirected to '{}'", entry.path(), to);
                    continuation = true;
                    request = Request::Path(to);
                }
                Arrival::Superseded => {
                    info_log!("Navigation to '{}' rerouted", entry.path());
                    return Ok(NavigationResult::Rerouted);
                }
            }
        }
    }
}

fn check_redirect_depth(redirects: usize, to: &str) -> Result<()> {
    if redirects > MAX_REDIRECT_DEPTH {
        error_log!(
            "Redirect loop detected (depth {}) navigating to '{}'",
            redirects,
            to
        );
        return Err(NavigationError::RedirectLoop {
            depth: redirects,
            path: to.to_string(),
        });
    }
    Ok(())
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current_path())
            .field("history_len", &self.history_len())
            .field("state", &self.state())
            .field("dialogs", &self.dialog_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Pipeline steps
// ============================================================================

impl NavigatorInner {
    fn current_entry(&self) -> Option<Rc<HistoryEntry>> {
        self.history.borrow().current().cloned()
    }

    fn current_path(&self) -> Option<String> {
        self.history
            .borrow()
            .current()
            .map(|entry| entry.path().to_string())
    }

    fn ensure_can_navigate(&self) -> Result<()> {
        if self.flags.navigation_blocked() {
            warn_log!("Navigation requested while navigation is blocked");
            return Err(NavigationError::invalid_operation(
                "navigation is blocked while views are committed or materialized",
            ));
        }
        if !self.dialogs.is_empty() {
            warn_log!("Navigation requested while {} dialog(s) are shown", self.dialogs.len());
            return Err(NavigationError::invalid_operation(
                "cannot navigate while a dialog is shown",
            ));
        }
        Ok(())
    }

    fn ensure_no_dialog(&self, after: &str) -> Result<()> {
        if self.dialogs.is_empty() {
            Ok(())
        } else {
            error_log!("A dialog was left open after {}", after);
            Err(NavigationError::invalid_operation(format!(
                "a dialog was left open after {}",
                after
            )))
        }
    }

    fn materializer(&self) -> Materializer<'_> {
        Materializer {
            views: &self.views,
            services: &*self.services,
            navigator: &self.this,
        }
    }

    // ------------------------------------------------------------------------
    // Step 2-3: resolve the target and the shared prefix
    // ------------------------------------------------------------------------

    fn plan(&self, request: &Request, continuation: bool) -> Result<Plan> {
        let history = self.history.borrow();
        let current = history.current().map(Rc::as_ref);
        let kind = if continuation {
            NavigationKind::Redirect
        } else {
            match request {
                Request::Path(_) | Request::Descriptor(_) => NavigationKind::New,
                Request::Back => NavigationKind::Back,
                Request::Forward => NavigationKind::Forward,
                Request::Refresh => NavigationKind::Refresh,
                Request::Partial { .. } => NavigationKind::Partial,
            }
        };
        let fresh_op = if continuation {
            HistoryOp::Replace
        } else {
            HistoryOp::Push
        };

        match request {
            Request::Path(path) => {
                let location = Location::parse(path);
                let parts = self.graph.resolve(location.path).ok_or_else(|| {
                    warn_log!("No route found for path '{}'", path);
                    NavigationError::RouteNotFound { path: path.clone() }
                })?;
                let route = Route::new(parts, location.options())?;
                let (items, prefix) = plan_items(&route, current, None);
                Ok(Plan {
                    route,
                    items,
                    prefix,
                    op: fresh_op,
                    kind,
                })
            }
            Request::Descriptor(descriptor) => {
                let route = self.graph.resolve_descriptor(descriptor)?;
                let (items, prefix) = plan_items(&route, current, None);
                Ok(Plan {
                    route,
                    items,
                    prefix,
                    op: fresh_op,
                    kind,
                })
            }
            Request::Back | Request::Forward => {
                let target = if matches!(request, Request::Back) {
                    history.peek_back()
                } else {
                    history.peek_forward()
                };
                let target = target.cloned().ok_or_else(|| {
                    NavigationError::invalid_operation(format!(
                        "no {} history",
                        if matches!(request, Request::Back) {
                            "back"
                        } else {
                            "forward"
                        }
                    ))
                })?;
                let prefix = current.map_or(0, |entry| {
                    entry
                        .items()
                        .iter()
                        .zip(target.items())
                        .take_while(|(a, b)| Rc::ptr_eq(a, b))
                        .count()
                });
                Ok(Plan {
                    route: target.route().clone(),
                    items: target.items().to_vec(),
                    prefix,
                    op: HistoryOp::MoveTo(target),
                    kind,
                })
            }
            Request::Refresh => {
                let entry = current.ok_or_else(|| {
                    NavigationError::invalid_operation("nothing to refresh")
                })?;
                let route = entry.route().clone();
                let keep = route.depth().saturating_sub(1);
                let (items, prefix) = plan_items(&route, Some(entry), Some(keep));
                Ok(Plan {
                    route,
                    items,
                    prefix,
                    op: HistoryOp::Replace,
                    kind,
                })
            }
            Request::Partial { depth, path } => {
                let entry = current.ok_or_else(|| {
                    NavigationError::invalid_operation("partial navigation needs a current route")
                })?;
                let ancestor = entry.route().parts().get(*depth).ok_or_else(|| {
                    NavigationError::invalid_operation(format!(
                        "current route has no level {} to navigate below",
                        depth
                    ))
                })?;
                let location = Location::parse(path);
                let suffix = self
                    .graph
                    .match_below(ancestor.part().view_model(), location.path)
                    .ok_or_else(|| {
                        warn_log!(
                            "No route below {} matches '{}'",
                            ancestor.part().view_model().name(),
                            path
                        );
                        NavigationError::RouteNotFound { path: path.clone() }
                    })?;
                let mut parts = entry.route().parts()[..=*depth].to_vec();
                parts.extend(suffix);
                let route = Route::new(parts, location.options())?;
                let (items, prefix) = plan_items(&route, Some(entry), None);
                Ok(Plan {
                    route,
                    items,
                    prefix,
                    op: fresh_op,
                    kind,
                })
            }
        }
    }

    // ------------------------------------------------------------------------
    // Step 4: navigating away
    // ------------------------------------------------------------------------

    async fn navigate_away(&self, plan: &Plan, ticket: NavigationTicket) -> Result<Away> {
        let Some(current) = self.current_entry() else {
            return Ok(Away::Proceed);
        };
        let args = NavigatingAwayArgs {
            from: current.route().clone(),
            to: plan.route.clone(),
            kind: plan.kind,
            navigator: self.this.clone(),
            dialogs: self.dialogs.navigation_presenter(),
        };
        let prefix = plan.prefix.min(current.items().len());

        for item in current.items()[prefix..].iter().rev() {
            if !item.is_navigated_to() {
                continue;
            }
            let Some(view_model) = item.view_model() else {
                continue;
            };
            trace_log!("on_navigating_away: {}", view_model.debug_name());
            let action = view_model.on_navigating_away(&args).await?;
            self.ensure_no_dialog("on_navigating_away")?;
            if self.generation.is_superseded(ticket) {
                return Ok(Away::Superseded);
            }
            match action {
                NavigationAction::Continue => {}
                NavigationAction::Deny { reason } => return Ok(Away::Cancelled(reason)),
                NavigationAction::Redirect { to, .. } => return Ok(Away::Redirect(to)),
            }
        }
        Ok(Away::Proceed)
    }

    // ------------------------------------------------------------------------
    // Steps 5-7: supersede, update history, notify the departed items
    // ------------------------------------------------------------------------

    /// Returns the committed entry and the entry that was current before,
    /// or `None` when a newer run committed first.
    #[allow(clippy::type_complexity)]
    fn commit(
        &self,
        plan: &Plan,
        ticket: NavigationTicket,
        continuation: bool,
    ) -> Result<Option<(Rc<HistoryEntry>, Option<Rc<HistoryEntry>>)>> {
        let _block = self.flags.block(Block::Sync);
        self.state.set(NavigationState::Committing);
        self.ensure_no_dialog("navigating away")?;

        if !self.generation.activate(ticket) {
            return Ok(None);
        }
        let superseded = self.in_flight.replace(Some(ticket)).filter(|t| *t != ticket);
        if let Some(older) = superseded {
            info_log!("Navigation {:?} supersedes {:?}", ticket, older);
        }
        let reroute = continuation || superseded.is_some();

        let (entry, departed) = {
            let mut history = self.history.borrow_mut();
            let departed = history.current().cloned();
            let entry = match &plan.op {
                HistoryOp::MoveTo(target) => {
                    let index = history.position(target).ok_or_else(|| {
                        NavigationError::invalid_operation(
                            "the target history entry no longer exists",
                        )
                    })?;
                    history.move_to(index);
                    Rc::clone(target)
                }
                HistoryOp::Replace => {
                    let entry = Rc::new(HistoryEntry::new(plan.route.clone(), plan.items.clone()));
                    let old = history.replace(Rc::clone(&entry));
                    self.retired.borrow_mut().extend(old);
                    entry
                }
                HistoryOp::Push if reroute => {
                    // The superseded run may have been a back/forward move,
                    // so the forward tail still has to go.
                    let entry = Rc::new(HistoryEntry::new(plan.route.clone(), plan.items.clone()));
                    let old = history.replace(Rc::clone(&entry));
                    let truncated = history.truncate_forward();
                    let mut retired = self.retired.borrow_mut();
                    retired.extend(old);
                    retired.extend(truncated);
                    entry
                }
                HistoryOp::Push => {
                    let entry = Rc::new(HistoryEntry::new(plan.route.clone(), plan.items.clone()));
                    let truncated = history.push(Rc::clone(&entry));
                    self.retired.borrow_mut().extend(truncated);
                    entry
                }
            };
            (entry, departed)
        };
        debug_log!(
            "Committed '{}' at history index {:?}",
            entry.path(),
            self.history.borrow().current_index()
        );

        if let Some(departed) = &departed {
            for item in departed.items().iter().rev() {
                let reappears = entry.items().iter().any(|i| Rc::ptr_eq(i, item));
                if reappears || !item.is_navigated_to() {
                    continue;
                }
                if let Some(view_model) = item.view_model() {
                    trace_log!("on_navigated_away: {}", view_model.debug_name());
                    view_model.on_navigated_away();
                }
                item.mark_navigated_away();
            }
        }
        Ok(Some((entry, departed)))
    }

    // ------------------------------------------------------------------------
    // Step 8: navigating to
    // ------------------------------------------------------------------------

    async fn navigate_to(
        &self,
        plan: &Plan,
        entry: &Rc<HistoryEntry>,
        ticket: NavigationTicket,
    ) -> Result<Arrival> {
        let items = entry.items();
        let route = entry.route();
        let mut inherited = RouteParams::new();

        for (depth, item) in items.iter().enumerate() {
            let params = route.parts()[depth].params().clone();
            inherited = RouteParams::merge(&inherited, &params);
            let has_child = depth + 1 < items.len();
            let already_active = depth < plan.prefix && item.is_navigated_to();

            if !already_active {
                let _block = self.flags.block(Block::Sync);
                self.materializer().ensure_materialized(items, depth)?;
            }
            let view_model = item.view_model().ok_or_else(|| {
                NavigationError::consistency(format!(
                    "{} has no view-model after materialization",
                    item.part().part().view_model().name()
                ))
            })?;
            let is_first_navigation = if already_active {
                false
            } else {
                item.mark_navigated_to()
            };

            let args = NavigatedToArgs {
                route: route.clone(),
                params,
                inherited_params: inherited.clone(),
                depth,
                is_first_navigation,
                already_active,
                has_child,
                kind: plan.kind,
                navigator: self.this.clone(),
                dialogs: self.dialogs.navigation_presenter(),
            };
            trace_log!(
                "on_navigated_to: {} (depth {}, first {}, active {}, child {})",
                view_model.debug_name(),
                depth,
                is_first_navigation,
                already_active,
                has_child
            );
            let action = view_model.on_navigated_to(&args).await?;
            self.ensure_no_dialog("on_navigated_to")?;
            if !self.generation.is_current(ticket) {
                return Ok(Arrival::Superseded);
            }

            match action {
                NavigationAction::Continue => {}
                NavigationAction::Deny { reason } => {
                    warn_log!(
                        "{} denied an incoming navigation ({}); ignored",
                        view_model.debug_name(),
                        reason
                    );
                }
                NavigationAction::Redirect { to, .. } => {
                    if already_active && has_child {
                        error_log!(
                            "{} redirected to '{}' after its nested navigation began",
                            view_model.debug_name(),
                            to
                        );
                        return Err(NavigationError::invalid_operation(format!(
                            "{} cannot redirect once a nested navigation has begun",
                            view_model.debug_name()
                        )));
                    }
                    return Ok(Arrival::Redirect(to));
                }
            }

            if !already_active {
                self.attach(items, depth)?;
            }
        }
        Ok(Arrival::Complete)
    }

    /// Show `items[depth]` in its parent's nested host (the root host at
    /// depth 0).
    fn attach(&self, items: &[Rc<RouteItem>], depth: usize) -> Result<()> {
        let _block = self.flags.block(Block::Sync);
        let item = &items[depth];
        item.check_consistency()?;
        let view = item.view().ok_or_else(|| {
            NavigationError::consistency(format!(
                "{} has no view to attach",
                item.part().part().view_model().name()
            ))
        })?;
        let host = if depth == 0 {
            Rc::clone(&self.root_host)
        } else {
            let parent = &items[depth - 1];
            parent.nested_host().ok_or_else(|| {
                NavigationError::consistency(format!(
                    "{} has no nested host for {}",
                    parent.part().part().view_model().name(),
                    item.part().part().view_model().name()
                ))
            })?
        };
        host.set_content(Some(view));
        trace_log!(
            "Attached {} at depth {}",
            item.part().part().view_model().name(),
            depth
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Step 9: clean up and evict
    // ------------------------------------------------------------------------

    fn finish(&self, entry: &Rc<HistoryEntry>, departed: Option<&Rc<HistoryEntry>>) {
        let _block = self.flags.block(Block::Sync);
        if let Some(host) = entry.items().last().and_then(|leaf| leaf.nested_host()) {
            host.set_content(None);
        }
        let retired = std::mem::take(&mut *self.retired.borrow_mut());
        let policy = EvictionPolicy {
            max_history_size: self.config.max_history_size,
            max_back_cache_depth: self.config.max_back_cache_depth,
            max_forward_cache_depth: self.config.max_forward_cache_depth,
        };
        let doomed = select_evictions(&mut self.history.borrow_mut(), departed, retired, policy);
        dispose_all(&doomed);
    }
}

/// Tracks one running pipeline; resets the shared state when the last one
/// ends, however it ends.
struct RunScope<'a> {
    inner: &'a NavigatorInner,
    ticket: NavigationTicket,
}

impl<'a> RunScope<'a> {
    fn enter(inner: &'a NavigatorInner, ticket: NavigationTicket) -> Self {
        inner.running.set(inner.running.get() + 1);
        Self { inner, ticket }
    }
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        if self.inner.in_flight.get() == Some(self.ticket) {
            self.inner.in_flight.set(None);
        }
        let running = self.inner.running.get().saturating_sub(1);
        self.inner.running.set(running);
        if running == 0 {
            self.inner.state.set(NavigationState::Idle);
        }
    }
}

// ============================================================================
// NavigatorBuilder
// ============================================================================

/// Collects registrations and collaborators, then freezes them into a
/// [`Navigator`].
pub struct NavigatorBuilder {
    config: NavigatorConfig,
    views: Vec<ViewRegistration>,
    routes: Vec<RouteDefinition>,
    dialogs: Vec<DialogRegistration>,
    services: Option<Rc<dyn ServiceLookup>>,
    tasks: Option<Rc<dyn TaskRunner>>,
    root_host: Option<Rc<dyn NestedHost>>,
    dialog_surface: Option<Rc<dyn DialogSurface>>,
}

impl NavigatorBuilder {
    pub fn new() -> Self {
        Self {
            config: NavigatorConfig::default(),
            views: Vec::new(),
            routes: Vec::new(),
            dialogs: Vec::new(),
            services: None,
            tasks: None,
            root_host: None,
            dialog_surface: None,
        }
    }

    pub fn config(mut self, config: NavigatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn view(mut self, registration: ViewRegistration) -> Self {
        self.views.push(registration);
        self
    }

    /// Register a route part. Order matters: it breaks matching ties.
    pub fn route(mut self, definition: RouteDefinition) -> Self {
        self.routes.push(definition);
        self
    }

    pub fn dialog(mut self, registration: DialogRegistration) -> Self {
        self.dialogs.push(registration);
        self
    }

    /// Last-resort dependency lookup for view-model factories.
    pub fn services(mut self, services: impl ServiceLookup + 'static) -> Self {
        self.services = Some(Rc::new(services));
        self
    }

    pub fn task_runner(mut self, tasks: Rc<dyn TaskRunner>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Surface that shows the root view. Defaults to a [`ContentSlot`].
    pub fn root_host(mut self, host: Rc<dyn NestedHost>) -> Self {
        self.root_host = Some(host);
        self
    }

    pub fn dialog_surface(mut self, surface: Rc<dyn DialogSurface>) -> Self {
        self.dialog_surface = Some(surface);
        self
    }

    pub fn build(self) -> Result<Navigator> {
        self.config.validate()?;

        let mut views = ViewRegistry::new();
        for registration in self.views {
            views.register(registration)?;
        }

        let graph = RouteGraph::new();
        #[cfg(feature = "cache")]
        let graph = graph.with_cache(self.config.resolution_cache_capacity);
        let mut graph = graph;
        for definition in &self.routes {
            graph.add_route(definition, &views)?;
        }

        let mut dialog_registry = DialogRegistry::new();
        for registration in self.dialogs {
            dialog_registry.register(registration)?;
        }
        let dialog_count = dialog_registry.len();

        let flags = Rc::new(BlockingFlags::new());
        let surface = self
            .dialog_surface
            .unwrap_or_else(|| Rc::new(NullSurface) as Rc<dyn DialogSurface>);
        let dialogs = DialogStack::new(Rc::clone(&flags), surface, dialog_registry);
        let services = self
            .services
            .unwrap_or_else(|| Rc::new(NoServices) as Rc<dyn ServiceLookup>);
        let tasks = self
            .tasks
            .unwrap_or_else(|| Rc::new(LocalTaskRunner::detached()) as Rc<dyn TaskRunner>);
        let root_host = self
            .root_host
            .unwrap_or_else(|| Rc::new(ContentSlot::new()) as Rc<dyn NestedHost>);

        info_log!(
            "Navigator built: {} route(s), {} view(s), {} dialog(s)",
            graph.len(),
            views.len(),
            dialog_count
        );

        let inner = Rc::new_cyclic(|this| NavigatorInner {
            config: self.config,
            graph,
            views,
            services,
            tasks,
            root_host,
            dialogs,
            flags,
            history: RefCell::new(HistoryList::new()),
            generation: NavigationGeneration::new(),
            in_flight: Cell::new(None),
            running: Cell::new(0),
            state: Cell::new(NavigationState::Idle),
            retired: RefCell::new(Vec::new()),
            this: WeakNavigator {
                inner: this.clone(),
            },
        });
        Ok(Navigator { inner })
    }
}

impl Default for NavigatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NavigatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigatorBuilder")
            .field("config", &self.config)
            .field("views", &self.views.len())
            .field("routes", &self.routes.len())
            .field("dialogs", &self.dialogs.len())
            .finish_non_exhaustive()
    }
}
