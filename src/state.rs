//! Navigation history and in-flight tracking.
//!
//! [`HistoryList`] is the back+forward timeline: a vector of shared
//! [`HistoryEntry`] values with a current index. Entries are `Rc`s so that
//! back then forward lands on the very same entry object.
//!
//! [`NavigationGeneration`] hands out tickets to navigation runs and tracks
//! which one is active, letting a run detect that it has been superseded.

use crate::item::RouteItem;
use crate::route::Route;
use std::cell::Cell;
use std::rc::Rc;

// ============================================================================
// HistoryEntry
// ============================================================================

/// One position in the history: a route and the items materializing it.
#[derive(Debug)]
pub struct HistoryEntry {
    route: Route,
    items: Vec<Rc<RouteItem>>,
}

impl HistoryEntry {
    pub(crate) fn new(route: Route, items: Vec<Rc<RouteItem>>) -> Self {
        debug_assert_eq!(route.depth(), items.len());
        Self { route, items }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Route items from root to leaf.
    pub fn items(&self) -> &[Rc<RouteItem>] {
        &self.items
    }

    pub fn path(&self) -> &str {
        self.route.path()
    }
}

// ============================================================================
// HistoryList
// ============================================================================

/// Bounded back+forward timeline with a current-position pointer.
///
/// `current_index()` is `None` until the first entry is pushed; afterwards
/// `0 <= current < len` holds.
#[derive(Debug, Default)]
pub struct HistoryList {
    entries: Vec<Rc<HistoryEntry>>,
    current: usize,
}

impl HistoryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.current)
    }

    pub fn current(&self) -> Option<&Rc<HistoryEntry>> {
        self.entries.get(self.current)
    }

    pub fn get(&self, index: usize) -> Option<&Rc<HistoryEntry>> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[Rc<HistoryEntry>] {
        &self.entries
    }

    /// Index of `entry`, compared by identity.
    pub fn position(&self, entry: &Rc<HistoryEntry>) -> Option<usize> {
        self.entries.iter().position(|e| Rc::ptr_eq(e, entry))
    }

    /// Drop forward history, append `entry` and make it current.
    ///
    /// Returns the dropped forward entries.
    pub fn push(&mut self, entry: Rc<HistoryEntry>) -> Vec<Rc<HistoryEntry>> {
        let truncated = self.truncate_forward();
        self.entries.push(entry);
        self.current = self.entries.len() - 1;
        truncated
    }

    /// Replace the current entry in place, returning the old one.
    ///
    /// On an empty list this is a push.
    pub fn replace(&mut self, entry: Rc<HistoryEntry>) -> Option<Rc<HistoryEntry>> {
        match self.entries.get_mut(self.current) {
            Some(slot) => Some(std::mem::replace(slot, entry)),
            None => {
                self.push(entry);
                None
            }
        }
    }

    /// Make `index` current. Returns `false` when out of range.
    pub fn move_to(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    /// Drop every entry after the current one, returning them.
    pub fn truncate_forward(&mut self) -> Vec<Rc<HistoryEntry>> {
        if self.entries.is_empty() {
            Vec::new()
        } else {
            self.entries.split_off(self.current + 1)
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.current > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.current + 1 < self.entries.len()
    }

    /// Entry that `back()` would land on, without moving.
    pub fn peek_back(&self) -> Option<&Rc<HistoryEntry>> {
        self.current.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Entry that `forward()` would land on, without moving.
    pub fn peek_forward(&self) -> Option<&Rc<HistoryEntry>> {
        self.entries.get(self.current + 1)
    }

    /// Drop the oldest entries until at most `max` remain.
    ///
    /// The current entry is never dropped; returns the removed entries.
    pub fn trim_to(&mut self, max: usize) -> Vec<Rc<HistoryEntry>> {
        let excess = self
            .entries
            .len()
            .saturating_sub(max.max(1))
            .min(self.current);
        self.current -= excess;
        self.entries.drain(..excess).collect()
    }
}

// ============================================================================
// NavigationGeneration
// ============================================================================

/// Ticket identifying one navigation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NavigationTicket(u64);

/// Generation counter for last-writer-wins cancellation.
///
/// Every request takes a ticket when it starts. When it commits, it
/// activates its ticket, which makes every older run stale. Checkpoints
/// before the commit ask [`is_superseded`](Self::is_superseded), later ones
/// [`is_current`](Self::is_current).
#[derive(Debug, Default)]
pub struct NavigationGeneration {
    issued: Cell<u64>,
    active: Cell<u64>,
}

impl NavigationGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a fresh ticket.
    pub fn issue(&self) -> NavigationTicket {
        let next = self.issued.get() + 1;
        self.issued.set(next);
        NavigationTicket(next)
    }

    /// Make `ticket` the active run.
    ///
    /// Fails if a newer ticket has already been activated.
    pub fn activate(&self, ticket: NavigationTicket) -> bool {
        if ticket.0 < self.active.get() {
            return false;
        }
        self.active.set(ticket.0);
        true
    }

    /// Whether `ticket` is still the active run.
    pub fn is_current(&self, ticket: NavigationTicket) -> bool {
        self.active.get() == ticket.0
    }

    /// Whether a newer run has already been activated.
    pub fn is_superseded(&self, ticket: NavigationTicket) -> bool {
        self.active.get() > ticket.0
    }
}
