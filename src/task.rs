//! Busy tracking and UI-context task posting.
//!
//! The navigator does not own an executor. It talks to a [`TaskRunner`]
//! that can mark itself busy while a navigation pipeline runs and can run
//! fire-and-forget work on the UI context. [`LocalTaskRunner`] is the
//! default, backed by a `futures` [`LocalSpawner`].

use crate::error::{NavigationError, Result};
use crate::warn_log;
use futures::executor::LocalSpawner;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use std::cell::Cell;
use std::future::Future;

/// Busy signal and UI-context posting.
pub trait TaskRunner {
    /// Increment the busy count.
    fn enter_busy(&self);

    /// Decrement the busy count.
    fn exit_busy(&self);

    /// Run `task` on the UI context without waiting for it.
    ///
    /// Fails when the task cannot be scheduled; it is dropped unrun.
    fn post(&self, task: LocalBoxFuture<'static, ()>) -> Result<()>;
}

/// Marks a [`TaskRunner`] busy for as long as it lives.
pub struct BusyScope<'a> {
    runner: &'a dyn TaskRunner,
}

impl<'a> BusyScope<'a> {
    pub fn enter(runner: &'a dyn TaskRunner) -> Self {
        runner.enter_busy();
        Self { runner }
    }
}

impl Drop for BusyScope<'_> {
    fn drop(&mut self) {
        self.runner.exit_busy();
    }
}

/// Await `operation` with `runner` marked busy.
pub async fn run_as_busy<F: Future>(runner: &dyn TaskRunner, operation: F) -> F::Output {
    let _busy = BusyScope::enter(runner);
    operation.await
}

/// [`TaskRunner`] backed by a [`LocalSpawner`].
///
/// ```
/// use futures::executor::LocalPool;
/// use view_navigator::{LocalTaskRunner, TaskRunner};
///
/// let mut pool = LocalPool::new();
/// let runner = LocalTaskRunner::new(pool.spawner());
/// runner.post(Box::pin(async {})).unwrap();
/// pool.run();
/// assert!(!runner.is_busy());
/// ```
#[derive(Debug, Default)]
pub struct LocalTaskRunner {
    spawner: Option<LocalSpawner>,
    busy: Cell<usize>,
}

impl LocalTaskRunner {
    pub fn new(spawner: LocalSpawner) -> Self {
        Self {
            spawner: Some(spawner),
            busy: Cell::new(0),
        }
    }

    /// A runner without an executor. Busy tracking works; posting fails.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get() > 0
    }

    /// Number of busy scopes currently open.
    pub fn busy_count(&self) -> usize {
        self.busy.get()
    }
}

impl TaskRunner for LocalTaskRunner {
    fn enter_busy(&self) {
        self.busy.set(self.busy.get() + 1);
    }

    fn exit_busy(&self) {
        self.busy.set(self.busy.get().saturating_sub(1));
    }

    fn post(&self, task: LocalBoxFuture<'static, ()>) -> Result<()> {
        let Some(spawner) = &self.spawner else {
            warn_log!("No executor attached; posted task dropped");
            return Err(NavigationError::invalid_operation(
                "the task runner has no executor attached",
            ));
        };
        spawner.spawn_local(task).map_err(|err| {
            warn_log!("Failed to post task to the UI context: {}", err);
            NavigationError::invalid_operation(format!("cannot post task: {err}"))
        })
    }
}
