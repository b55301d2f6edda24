//! Route items: the materialization records behind history entries.
//!
//! A [`RouteItem`] belongs to one position of a route chain. It starts out
//! empty and is materialized lazily the first time the navigator walks
//! into it. Items are shared between history entries when the concrete route
//! part at that position is unchanged, so an ancestor shown across several
//! entries keeps one view-model.
//!
//! [`select_evictions`] applies the back/forward cache policy after each
//! completed navigation.

use crate::error::{NavigationError, Result};
use crate::lifecycle::ViewModel;
use crate::navigator::WeakNavigator;
use crate::route::{ConcreteRoutePart, Route};
use crate::services::{ResolveContext, ServiceLookup};
use crate::state::{HistoryEntry, HistoryList};
use crate::view::{Materialized, NestedHost, View, ViewRegistry};
use crate::{debug_log, error_log, trace_log};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

// ============================================================================
// RouteItem
// ============================================================================

/// Materialization record for one concrete route part.
pub struct RouteItem {
    part: ConcreteRoutePart,
    materialized: RefCell<Option<Materialized>>,
    navigated_to: Cell<bool>,
    first_navigation: Cell<bool>,
}

impl RouteItem {
    pub(crate) fn new(part: ConcreteRoutePart) -> Self {
        Self {
            part,
            materialized: RefCell::new(None),
            navigated_to: Cell::new(false),
            first_navigation: Cell::new(true),
        }
    }

    pub fn part(&self) -> &ConcreteRoutePart {
        &self.part
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized.borrow().is_some()
    }

    /// The view-model, once materialized.
    pub fn view_model(&self) -> Option<Rc<dyn ViewModel>> {
        self.materialized
            .borrow()
            .as_ref()
            .map(|m| Rc::clone(&m.view_model))
    }

    /// The view-model as its concrete type.
    pub fn view_model_as<T: 'static>(&self) -> Option<Rc<T>> {
        let any = self
            .materialized
            .borrow()
            .as_ref()
            .map(|m| Rc::clone(&m.view_model_any))?;
        any.downcast::<T>().ok()
    }

    /// The view, once materialized.
    pub fn view(&self) -> Option<Rc<dyn View>> {
        self.materialized
            .borrow()
            .as_ref()
            .map(|m| Rc::clone(&m.view))
    }

    /// Has received its incoming callback and not yet been navigated away.
    pub fn is_navigated_to(&self) -> bool {
        self.navigated_to.get()
    }

    /// Has never received an incoming callback since it was (re)created.
    pub fn is_first_navigation(&self) -> bool {
        self.first_navigation.get()
    }

    pub(crate) fn mark_navigated_to(&self) -> bool {
        self.navigated_to.set(true);
        self.first_navigation.replace(false)
    }

    pub(crate) fn mark_navigated_away(&self) {
        self.navigated_to.set(false);
    }

    /// Nested host of the materialized view.
    pub(crate) fn nested_host(&self) -> Option<Rc<dyn NestedHost>> {
        self.view().and_then(|view| view.nested_host())
    }

    /// Check that the view still reports the view-model it was built with.
    pub(crate) fn check_consistency(&self) -> Result<()> {
        let guard = self.materialized.borrow();
        let Some(materialized) = guard.as_ref() else {
            return Ok(());
        };
        let reported = materialized.view.view_model();
        if same_view_model(&reported, &materialized.view_model) {
            Ok(())
        } else {
            error_log!(
                "View for {} reports a different view-model ({})",
                self.part.part().view_model().name(),
                reported.debug_name()
            );
            Err(NavigationError::consistency(format!(
                "view for {} is bound to {} instead of its own view-model",
                self.part.part().view_model().name(),
                reported.debug_name()
            )))
        }
    }

    /// Tear the materialized pair down and reset the flags.
    pub(crate) fn dispose(&self) {
        let taken = self.materialized.borrow_mut().take();
        if let Some(materialized) = taken {
            trace_log!("Disposing {}", materialized.view_model.debug_name());
            materialized.view_model.dispose();
        }
        self.navigated_to.set(false);
        self.first_navigation.set(true);
    }
}

impl std::fmt::Debug for RouteItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteItem")
            .field("view_model", &self.part.part().view_model().name())
            .field("params", self.part.params())
            .field("materialized", &self.is_materialized())
            .field("navigated_to", &self.navigated_to.get())
            .field("first_navigation", &self.first_navigation.get())
            .finish()
    }
}

fn same_view_model(a: &Rc<dyn ViewModel>, b: &Rc<dyn ViewModel>) -> bool {
    std::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
}

// ============================================================================
// Materialization
// ============================================================================

/// Shared inputs for [`Materializer::ensure_materialized`].
pub(crate) struct Materializer<'a> {
    pub(crate) views: &'a ViewRegistry,
    pub(crate) services: &'a dyn ServiceLookup,
    pub(crate) navigator: &'a WeakNavigator,
}

impl Materializer<'_> {
    /// Build the view-model and view of `items[index]` if it has none yet.
    ///
    /// `items[..index]` are the ancestors consulted for dependencies.
    pub(crate) fn ensure_materialized(&self, items: &[Rc<RouteItem>], index: usize) -> Result<()> {
        let item = &items[index];
        if item.is_materialized() {
            trace_log!(
                "Reusing materialized {}",
                item.part.part().view_model().name()
            );
            return item.check_consistency();
        }

        let key = item.part.part().view_model();
        let registration = self.views.get(key).ok_or_else(|| {
            NavigationError::configuration(format!("no view registered for {}", key.name()))
        })?;
        let ctx = ResolveContext {
            params: item.part.params(),
            ancestors: &items[..index],
            services: self.services,
            navigator: self.navigator,
            requested_by: key.name(),
        };
        let materialized = registration.build(&ctx)?;

        if !same_view_model(&materialized.view.view_model(), &materialized.view_model) {
            error_log!("View built for {} is bound to another view-model", key.name());
            return Err(NavigationError::consistency(format!(
                "view built for {} is bound to another view-model",
                key.name()
            )));
        }
        if registration.hosts_children() && materialized.view.nested_host().is_none() {
            error_log!("View for {} hosts children but has no nested host", key.name());
            return Err(NavigationError::consistency(format!(
                "view for {} is registered as hosting children but exposes no nested host",
                key.name()
            )));
        }

        debug_log!("Materialized {} at depth {}", key.name(), index);
        *item.materialized.borrow_mut() = Some(materialized);
        item.first_navigation.set(true);
        Ok(())
    }
}

// ============================================================================
// Prefix reuse
// ============================================================================

/// Items for `target`, reusing `current`'s items over the common prefix.
pub(crate) fn plan_items(
    target: &Route,
    current: Option<&HistoryEntry>,
    keep_prefix: Option<usize>,
) -> (Vec<Rc<RouteItem>>, usize) {
    let prefix = current.map_or(0, |entry| {
        let common = entry.route().common_prefix_len(target);
        keep_prefix.map_or(common, |limit| common.min(limit))
    });
    let mut items = Vec::with_capacity(target.depth());
    if let Some(entry) = current {
        items.extend(entry.items()[..prefix].iter().cloned());
    }
    items.extend(
        target.parts()[prefix..]
            .iter()
            .cloned()
            .map(|part| Rc::new(RouteItem::new(part))),
    );
    (items, prefix)
}

// ============================================================================
// Eviction
// ============================================================================

/// Back/forward cache limits used by [`select_evictions`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct EvictionPolicy {
    pub(crate) max_history_size: usize,
    pub(crate) max_back_cache_depth: usize,
    pub(crate) max_forward_cache_depth: usize,
}

/// Trim `history` and pick every materialized item outside the keep set.
///
/// Cacheable items are kept inside two windows: one around the current
/// entry and one around `departed`, the entry the finished navigation left
/// (skipped when that entry is no longer in the history). `retired` are entries removed from the history by navigations
/// (replaced or truncated forward entries). Nothing is disposed here, so
/// the caller can release its borrow of the history first.
pub(crate) fn select_evictions(
    history: &mut HistoryList,
    departed: Option<&Rc<HistoryEntry>>,
    retired: Vec<Rc<HistoryEntry>>,
    policy: EvictionPolicy,
) -> Vec<Rc<RouteItem>> {
    let mut candidates = retired;
    candidates.extend(history.trim_to(policy.max_history_size));

    let Some(current_index) = history.current_index() else {
        return Vec::new();
    };
    let window = |anchor: usize| {
        anchor.saturating_sub(policy.max_back_cache_depth)
            ..=anchor.saturating_add(policy.max_forward_cache_depth)
    };
    let around_current = window(current_index);
    let around_departed = departed
        .and_then(|entry| history.position(entry))
        .map(window);
    let in_window = |index: usize| {
        around_current.contains(&index)
            || around_departed.as_ref().is_some_and(|w| w.contains(&index))
    };

    let mut keep: HashSet<*const RouteItem> = HashSet::new();
    for (index, entry) in history.entries().iter().enumerate() {
        if index == current_index {
            keep.extend(entry.items().iter().map(Rc::as_ptr));
        } else if in_window(index) {
            keep.extend(
                entry
                    .items()
                    .iter()
                    .filter(|item| item.view_model().map_or(true, |vm| vm.can_be_cached()))
                    .map(Rc::as_ptr),
            );
        }
    }

    candidates.extend(history.entries().iter().cloned());
    let mut seen: HashSet<*const RouteItem> = HashSet::new();
    let mut doomed = Vec::new();
    for entry in &candidates {
        for item in entry.items() {
            let ptr = Rc::as_ptr(item);
            if keep.contains(&ptr) || !seen.insert(ptr) || !item.is_materialized() {
                continue;
            }
            doomed.push(Rc::clone(item));
        }
    }
    doomed
}

/// Dispose `items`, returning how many were disposed.
pub(crate) fn dispose_all(items: &[Rc<RouteItem>]) -> usize {
    for item in items {
        item.dispose();
    }
    if !items.is_empty() {
        debug_log!("Evicted {} materialized item(s)", items.len());
    }
    items.len()
}
