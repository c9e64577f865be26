//! Bounded fan-out of indexed work.
//!
//! A run starts one execution per unit of work, lets at most `max_parallel`
//! of them run at a time, and returns only after every unit has finished.
//! Failures never stop sibling units; they are collected and returned
//! together as one [`MultiError`].
//!
//! ## Returning results
//!
//! Every unit gets a distinct index, so results can be written into a
//! pre-sized [`Slots`] container without further locking:
//!
//! ```
//! use std::num::NonZeroUsize;
//! use fanout::{Dispatcher, Slots};
//!
//! let input = [10, 20, 30, 40, 50];
//! let results = Slots::new(input.len());
//!
//! let dispatcher = Dispatcher::new(NonZeroUsize::new(5).unwrap());
//! dispatcher
//!     .run_indexed(
//!         |idx| {
//!             let _ = results.set(idx, input[idx] * 10);
//!             Ok::<_, std::convert::Infallible>(())
//!         },
//!         input.len(),
//!         None,
//!     )
//!     .unwrap();
//!
//! let results: Vec<i32> = results.into_vec().into_iter().flatten().collect();
//! assert_eq!(results, vec![100, 200, 300, 400, 500]);
//! ```

mod async_run;
mod slots;
mod task_set;

pub use async_run::AsyncTaskSet;
pub use slots::Slots;
pub use task_set::TaskSet;

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread;

use tracing::{debug, trace};

use crate::config::Config;
use crate::errors::{ErrorList, MultiError, TaskError};
use crate::semaphore::Semaphore;

/// Outcome of a run: `Ok` if every unit succeeded, otherwise every failure.
pub type DispatchResult<E> = Result<(), MultiError<TaskError<E>>>;

/// Runs units of work concurrently under a cap.
///
/// Holds only the default cap; each run creates its own semaphore and error
/// collection, so one dispatcher can serve any number of runs at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatcher {
    max_parallel: NonZeroUsize,
}

impl Dispatcher {
    /// Create a dispatcher whose runs default to `max_parallel` concurrent
    /// units.
    pub fn new(max_parallel: NonZeroUsize) -> Self {
        Self { max_parallel }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_parallel)
    }

    /// Default cap used when a run does not supply one.
    pub fn max_parallel(&self) -> usize {
        self.max_parallel.get()
    }

    /// Cap for one run: `requested` if it is positive, else the default.
    fn cap(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(max) if max > 0 => max,
            _ => self.max_parallel.get(),
        }
    }

    /// Run `task` once for every index in `0..count`, at most `max_parallel`
    /// at a time (the dispatcher default if `None` or `Some(0)`).
    ///
    /// Every index runs, even after others fail. Blocks until all are done.
    ///
    /// # Returns
    /// `Ok(())` if no task failed (including `count == 0`), otherwise one
    /// error per failed index, in no particular order.
    ///
    /// # Panics
    /// If a task panics, the remaining units still run to completion and the
    /// first panic is then resumed on the calling thread.
    pub fn run_indexed<F, E>(
        &self,
        task: F,
        count: usize,
        max_parallel: Option<usize>,
    ) -> DispatchResult<E>
    where
        F: Fn(usize) -> Result<(), E> + Sync,
        E: Send + Sync,
    {
        self.run_units(count, max_parallel, &task)
    }

    /// Run every task in `tasks`, each given its position as the index.
    ///
    /// Not idempotent: every call runs every task again. Otherwise behaves
    /// like [`Dispatcher::run_indexed`].
    pub fn run_set<E>(&self, tasks: &TaskSet<'_, E>, max_parallel: Option<usize>) -> DispatchResult<E>
    where
        E: Send + Sync,
    {
        self.run_units(tasks.len(), max_parallel, &|index| tasks.call(index))
    }

    /// Like [`Dispatcher::run_indexed`], but each task returns a value that is
    /// stored at its index.
    ///
    /// Failed indices are `None` in the returned vector; results of the
    /// successful ones are kept even when the run as a whole fails.
    pub fn map_indexed<F, T, E>(
        &self,
        task: F,
        count: usize,
        max_parallel: Option<usize>,
    ) -> (Vec<Option<T>>, DispatchResult<E>)
    where
        F: Fn(usize) -> Result<T, E> + Sync,
        T: Send + Sync,
        E: Send + Sync,
    {
        let slots = Slots::new(count);
        let outcome = self.run_indexed(
            |index| {
                let value = task(index)?;
                let stored = slots.set(index, value).is_ok();
                debug_assert!(stored, "slot {} written twice in one run", index);
                Ok(())
            },
            count,
            max_parallel,
        );
        (slots.into_vec(), outcome)
    }

    fn run_units<E>(
        &self,
        count: usize,
        max_parallel: Option<usize>,
        task: &(dyn Fn(usize) -> Result<(), E> + Sync),
    ) -> DispatchResult<E>
    where
        E: Send + Sync,
    {
        if count == 0 {
            return Ok(());
        }

        let max = self.cap(max_parallel);
        debug!(count, max_parallel = max, "Starting run");

        let semaphore = Semaphore::new(max);
        let errors = ErrorList::new();

        let first_panic: Mutex<Option<Box<dyn Any + Send>>> = Mutex::new(None);

        thread::scope(|scope| {
            for index in 0..count {
                // Taken before spawning so no more than `max` units run at once.
                let permit = semaphore.acquire_scoped();
                let (errors, first_panic) = (&errors, &first_panic);
                // Handles are not kept: a finished thread is detached and
                // freed at once. The scope still waits for it.
                drop(scope.spawn(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| task(index)));
                    drop(permit);
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(source)) => {
                            trace!(index, "Task failed");
                            errors.push(TaskError::new(index, source));
                        }
                        Err(payload) => {
                            trace!(index, "Task panicked");
                            first_panic
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .get_or_insert(payload);
                        }
                    }
                }));
            }
        });

        if let Some(payload) = first_panic
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            panic::resume_unwind(payload);
        }

        debug!(count, failures = errors.len(), "Run finished");
        errors.into_result()
    }
}
