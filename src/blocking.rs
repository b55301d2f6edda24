//! Reentrancy guards.
//!
//! The navigator and the dialog stack share one [`BlockingFlags`]. Two kinds
//! of scope exist:
//!
//! - [`Block::Run`] lives as long as a navigation pipeline. Dialogs are
//!   refused unless they are opened through the presenter handed to the
//!   lifecycle callbacks of that navigation.
//! - [`Block::Sync`] covers commit, materialization and attachment. No new
//!   navigation and no dialog at all may start inside it.
//!
//! Flags are counters so scopes can nest, and a [`BlockScope`] releases what
//! it took when dropped, on every exit path.

use std::cell::Cell;

/// What a [`BlockScope`] marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Block {
    /// A navigation is in flight.
    Run,
    /// A synchronous section of a navigation.
    Sync,
}

#[derive(Debug, Default)]
pub(crate) struct BlockingFlags {
    runs: Cell<usize>,
    sync: Cell<usize>,
}

impl BlockingFlags {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn navigation_blocked(&self) -> bool {
        self.sync.get() > 0
    }

    /// Whether no dialog may open, whatever presenter asks.
    pub(crate) fn dialogs_blocked(&self) -> bool {
        self.sync.get() > 0
    }

    pub(crate) fn navigation_in_flight(&self) -> bool {
        self.runs.get() > 0
    }

    pub(crate) fn block(&self, what: Block) -> BlockScope<'_> {
        let counter = self.counter(what);
        counter.set(counter.get() + 1);
        BlockScope { flags: self, what }
    }

    fn counter(&self, what: Block) -> &Cell<usize> {
        match what {
            Block::Run => &self.runs,
            Block::Sync => &self.sync,
        }
    }
}

#[must_use = "the block is released as soon as the scope is dropped"]
pub(crate) struct BlockScope<'a> {
    flags: &'a BlockingFlags,
    what: Block,
}

impl Drop for BlockScope<'_> {
    fn drop(&mut self) {
        let counter = self.flags.counter(self.what);
        counter.set(counter.get().saturating_sub(1));
    }
}
