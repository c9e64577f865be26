//! Heterogeneous list of tasks run together.

use std::fmt;

use super::{DispatchResult, Dispatcher};

type BoxedTask<'a, E> = Box<dyn Fn(usize) -> Result<(), E> + Sync + 'a>;

/// Distinct tasks to run concurrently. Each task is called with its position
/// in the set.
///
/// Tasks are added before a run; running borrows the set immutably, so it
/// cannot change while a run is in progress. The empty set is ready to use.
///
/// ```
/// use std::num::NonZeroUsize;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use fanout::{Dispatcher, TaskSet};
///
/// let first_ran = AtomicBool::new(false);
/// let second_ran = AtomicBool::new(false);
///
/// let mut tasks = TaskSet::new();
/// tasks.add(|_| {
///     first_ran.store(true, Ordering::SeqCst);
///     Ok::<_, String>(())
/// });
/// tasks.add(|_| {
///     second_ran.store(true, Ordering::SeqCst);
///     Ok(())
/// });
///
/// tasks.run(&Dispatcher::new(NonZeroUsize::new(2).unwrap()), None).unwrap();
/// assert!(first_ran.load(Ordering::SeqCst) && second_ran.load(Ordering::SeqCst));
/// ```
pub struct TaskSet<'a, E> {
    tasks: Vec<BoxedTask<'a, E>>,
}

impl<'a, E> TaskSet<'a, E> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Append `task`. It will run with index `self.len()` (before the push).
    pub fn add<F>(&mut self, task: F)
    where
        F: Fn(usize) -> Result<(), E> + Sync + 'a,
    {
        self.tasks.push(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every task on `dispatcher`. See [`Dispatcher::run_set`].
    pub fn run(&self, dispatcher: &Dispatcher, max_parallel: Option<usize>) -> DispatchResult<E>
    where
        E: Send + Sync,
    {
        dispatcher.run_set(self, max_parallel)
    }

    pub(super) fn call(&self, index: usize) -> Result<(), E> {
        (self.tasks[index])(index)
    }
}

impl<E> Default for TaskSet<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for TaskSet<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSet").field("len", &self.tasks.len()).finish()
    }
}
