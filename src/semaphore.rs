//! Counting semaphore for limiting concurrency.
//!
//! # Invariants
//! - `0 <= available() <= max()` for every sequence of matched
//!   acquire/release calls, from any number of threads
//!
//! ```
//! use fanout::Semaphore;
//!
//! let sema = Semaphore::new(2);
//! {
//!     let _permit = sema.acquire_scoped();
//!     // at most two threads get here at a time
//! }
//! assert_eq!(sema.available(), 2);
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A fixed-capacity token pool.
///
/// Poisoned locks are recovered: the count is only written under the lock and
/// no user code runs while it is held.
#[derive(Debug)]
pub struct Semaphore {
    max: usize,
    available: Mutex<usize>,
    freed: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `max` tokens.
    ///
    /// # Panics
    /// Panics if `max == 0`. A gate that can never be entered is a caller bug,
    /// not a runtime condition.
    pub fn new(max: usize) -> Self {
        if max < 1 {
            panic!("Semaphore::new called with max < 1: {}", max);
        }
        Self {
            max,
            available: Mutex::new(max),
            freed: Condvar::new(),
        }
    }

    /// Capacity given at construction.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Tokens free right now. Only a snapshot; other threads may change it
    /// before the caller looks at the result.
    pub fn available(&self) -> usize {
        *self.lock()
    }

    /// Take a token, blocking until one is free. No timeout.
    ///
    /// Must be paired with exactly one [`Semaphore::release`]. Prefer
    /// [`Semaphore::acquire_scoped`], which cannot forget.
    pub fn acquire(&self) {
        let mut available = self.lock();
        while *available == 0 {
            available = self
                .freed
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
    }

    /// Take a token, blocking until one is free, and return a guard that
    /// gives it back when dropped.
    pub fn acquire_scoped(&self) -> Permit<'_> {
        self.acquire();
        Permit {
            semaphore: self,
            acquired: true,
        }
    }

    /// Take a token if one is free, without blocking.
    ///
    /// The returned permit is always safe to drop or release: if no token was
    /// obtained ([`Permit::is_acquired`] is `false`) releasing it does nothing.
    ///
    /// ```
    /// use fanout::Semaphore;
    ///
    /// let sema = Semaphore::new(1);
    /// let first = sema.try_acquire();
    /// let second = sema.try_acquire();
    /// assert!(first.is_acquired());
    /// assert!(!second.is_acquired());
    /// drop(second);
    /// assert_eq!(sema.available(), 0);
    /// ```
    pub fn try_acquire(&self) -> Permit<'_> {
        let mut available = self.lock();
        let acquired = *available > 0;
        if acquired {
            *available -= 1;
        }
        Permit {
            semaphore: self,
            acquired,
        }
    }

    /// Return a token to the pool and wake one waiter.
    ///
    /// # Precondition
    /// A matching [`Semaphore::acquire`] happened earlier. Releasing more
    /// tokens than were taken breaks `available() <= max()`; debug builds
    /// assert on it.
    pub fn release(&self) {
        let mut available = self.lock();
        debug_assert!(
            *available < self.max,
            "Semaphore::release called without a matching acquire"
        );
        *available += 1;
        drop(available);
        self.freed.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A token taken from a [`Semaphore`], returned on drop.
///
/// A permit from a failed [`Semaphore::try_acquire`] holds nothing and its
/// release is a no-op.
#[must_use = "the token is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
    acquired: bool,
}

impl Permit<'_> {
    /// Whether this permit actually holds a token.
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Give the token back now. Same as dropping the permit.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.acquired {
            self.acquired = false;
            self.semaphore.release();
        }
    }
}
