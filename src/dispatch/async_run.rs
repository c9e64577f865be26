//! Bounded fan-out of futures on the tokio runtime.
//!
//! Same contract as the blocking runs: one tokio task per unit, a permit from
//! a per-run semaphore before the task body is polled, every failure collected
//! into a shared [`ErrorList`], and the call resolves only once every unit has
//! finished.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, trace, warn};

use super::{DispatchResult, Dispatcher};
use crate::errors::{ErrorList, TaskError};

type SharedTask<E> = Arc<dyn Fn(usize) -> BoxFuture<'static, Result<(), E>> + Send + Sync>;

/// Distinct async tasks to run concurrently, each called with its position.
///
/// The async counterpart of [`super::TaskSet`]. Tasks must be `'static`
/// because each unit runs as its own tokio task.
pub struct AsyncTaskSet<E> {
    tasks: Vec<SharedTask<E>>,
}

impl<E> AsyncTaskSet<E> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn add<F, Fut>(&mut self, task: F)
    where
        F: Fn(usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.tasks.push(Arc::new(move |index| task(index).boxed()));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<E> Default for AsyncTaskSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for AsyncTaskSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTaskSet")
            .field("len", &self.tasks.len())
            .finish()
    }
}

impl Dispatcher {
    /// Async form of [`Dispatcher::run_indexed`].
    ///
    /// Spawns one tokio task per index, so it must be called from within a
    /// tokio runtime.
    ///
    /// # Panics
    /// A panicking unit is resumed on the caller once all other units have
    /// finished. A unit cancelled before completing (the runtime shutting
    /// down) also panics the caller, since its outcome is unknown.
    pub async fn run_indexed_async<F, Fut, E>(
        &self,
        task: F,
        count: usize,
        max_parallel: Option<usize>,
    ) -> DispatchResult<E>
    where
        F: Fn(usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + Sync + 'static,
    {
        let task = Arc::new(task);
        self.run_units_async(count, max_parallel, |index| {
            let task = Arc::clone(&task);
            async move { task(index).await }.boxed()
        })
        .await
    }

    /// Async form of [`Dispatcher::run_set`]. Every call runs every task.
    pub async fn run_set_async<E>(
        &self,
        tasks: &AsyncTaskSet<E>,
        max_parallel: Option<usize>,
    ) -> DispatchResult<E>
    where
        E: Send + Sync + 'static,
    {
        self.run_units_async(tasks.len(), max_parallel, |index| {
            let task = Arc::clone(&tasks.tasks[index]);
            async move { task(index).await }.boxed()
        })
        .await
    }

    /// `unit(index)` must not start any work until polled; the returned
    /// future is only polled once its permit is held.
    async fn run_units_async<E, U>(
        &self,
        count: usize,
        max_parallel: Option<usize>,
        unit: U,
    ) -> DispatchResult<E>
    where
        E: Send + Sync + 'static,
        U: Fn(usize) -> BoxFuture<'static, Result<(), E>>,
    {
        if count == 0 {
            return Ok(());
        }

        let max = self.cap(max_parallel);
        debug!(count, max_parallel = max, "Starting async run");

        let semaphore = Arc::new(Semaphore::new(max));
        let errors = Arc::new(ErrorList::new());
        let mut set = JoinSet::new();

        for index in 0..count {
            let work = unit(index);
            let semaphore = Arc::clone(&semaphore);
            let errors = Arc::clone(&errors);
            set.spawn(async move {
                // Never closed, so this is always `Ok`; the permit lives as
                // long as the binding.
                let _permit = semaphore.acquire().await;
                if let Err(source) = work.await {
                    trace!(index, "Task failed");
                    errors.push(TaskError::new(index, source));
                }
            });
        }

        let mut joined = Joined::default();
        while let Some(outcome) = set.join_next().await {
            joined.record(outcome);
        }
        joined.finish();

        let errors = Arc::into_inner(errors)
            .expect("every unit has been joined, so no other handle remains");
        debug!(count, failures = errors.len(), "Async run finished");
        errors.into_result()
    }
}

/// How the spawned units of one run ended, beyond their own results.
#[derive(Default)]
struct Joined {
    first_panic: Option<Box<dyn Any + Send>>,
    cancelled: usize,
}

impl Joined {
    fn record(&mut self, outcome: Result<(), JoinError>) {
        match outcome {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                self.first_panic.get_or_insert(e.into_panic());
            }
            Err(e) => {
                warn!("Unit ended without completing: {}", e);
                self.cancelled += 1;
            }
        }
    }

    /// Resume the first panic, or panic if any unit never completed.
    fn finish(self) {
        if let Some(payload) = self.first_panic {
            panic::resume_unwind(payload);
        }
        if self.cancelled > 0 {
            panic!("units cancelled before completing: {}", self.cancelled);
        }
    }
}
