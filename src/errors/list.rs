//! Lock-free, append-only error collection.
//!
//! Writers push onto a persistent singly linked list: each push allocates one
//! node that points at the snapshot the writer observed and publishes it with a
//! compare-and-swap on the head. Published nodes are never mutated and never
//! freed while the list is shared, so a reader holding `&ErrorList` can walk
//! any snapshot without a reclamation scheme.
//!
//! # Invariants
//! - every error passed to `push` is stored exactly once
//! - a null head means *empty* and no storage has been allocated
//! - iteration order is unspecified (currently most recent first)

use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use super::multi::{combine, MultiError};

struct Node<E> {
    error: E,
    next: *const Node<E>,
}

/// Errors gathered from concurrent writers.
///
/// `push` takes `&self` and never blocks other writers. Reading consumes the
/// list ([`ErrorList::into_result`], [`ErrorList::into_vec`]) or walks a
/// snapshot ([`ErrorList::iter`]).
pub struct ErrorList<E> {
    head: AtomicPtr<Node<E>>,
    _owns: PhantomData<Box<Node<E>>>,
}

// SAFETY: the list owns its `E` values and hands out only shared references
// to them. Pushing moves an `E` in from another thread (needs `E: Send`) and
// iterating shares `&E` across threads (needs `E: Sync`).
unsafe impl<E: Send> Send for ErrorList<E> {}
unsafe impl<E: Send + Sync> Sync for ErrorList<E> {}

impl<E> ErrorList<E> {
    /// An empty list. Allocates nothing.
    pub const fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
            _owns: PhantomData,
        }
    }

    /// Add `error`. Safe to call from any number of threads at once.
    pub fn push(&self, error: E) {
        let node = Box::into_raw(Box::new(Node {
            error,
            next: ptr::null(),
        }));

        let mut current = self.head.load(Ordering::Acquire);
        loop {
            // SAFETY: `node` is not yet published, so we still own it.
            unsafe { (*node).next = current };

            match self
                .head
                .compare_exchange_weak(current, node, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                // Lost the race: link onto the newer snapshot and retry.
                Err(newer) => current = newer,
            }
        }
    }

    /// Add the error from `result`, if any. `Ok` is discarded.
    pub fn push_result(&self, result: Result<(), E>) {
        if let Err(error) = result {
            self.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }

    /// Number of errors in the current snapshot. O(n).
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Walk the errors published so far.
    ///
    /// Errors pushed after the call are not seen by the returned iterator.
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            next: self.head.load(Ordering::Acquire),
            _list: PhantomData,
        }
    }

    /// Take every stored error out of the list. Order is unspecified.
    pub fn into_vec(mut self) -> Vec<E> {
        let mut out = Vec::new();
        let mut next = std::mem::replace(self.head.get_mut(), ptr::null_mut());
        while !next.is_null() {
            // SAFETY: we own the list exclusively and each node was created by
            // `Box::into_raw` in `push` and is visited exactly once.
            let Node { error, next: rest } = *unsafe { Box::from_raw(next) };
            next = rest as *mut Node<E>;
            out.push(error);
        }
        out
    }

    /// Hand every stored error to [`combine`].
    ///
    /// # Returns
    /// `Ok(())` if nothing was pushed, otherwise one [`MultiError`] holding
    /// every error.
    pub fn into_result(self) -> Result<(), MultiError<E>> {
        match combine(self.into_vec()) {
            Some(errors) => Err(errors),
            None => Ok(()),
        }
    }
}

impl<E> Default for ErrorList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Drop for ErrorList<E> {
    fn drop(&mut self) {
        // Iterative so long lists cannot overflow the stack.
        let mut next = std::mem::replace(self.head.get_mut(), ptr::null_mut());
        while !next.is_null() {
            // SAFETY: see `into_vec`.
            let node = unsafe { Box::from_raw(next) };
            next = node.next as *mut Node<E>;
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for ErrorList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<E> FromIterator<E> for ErrorList<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let list = Self::new();
        for error in iter {
            list.push(error);
        }
        list
    }
}

impl<'a, E> IntoIterator for &'a ErrorList<E> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Snapshot iterator returned by [`ErrorList::iter`].
pub struct Iter<'a, E> {
    next: *const Node<E>,
    _list: PhantomData<&'a ErrorList<E>>,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_null() {
            return None;
        }
        // SAFETY: published nodes are immutable and live as long as the list,
        // which this iterator borrows.
        let node = unsafe { &*self.next };
        self.next = node.next;
        Some(&node.error)
    }
}

// SAFETY: behaves like `&'a E` handed out from a shared `&ErrorList<E>`.
unsafe impl<E: Sync> Send for Iter<'_, E> {}
unsafe impl<E: Sync> Sync for Iter<'_, E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_empty() {
        let errors: ErrorList<String> = ErrorList::new();
        assert!(errors.is_empty());
        assert_eq!(errors.len(), 0);
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn ok_results_are_discarded() {
        let errors = ErrorList::new();
        errors.push_result(Ok(()));
        errors.push_result(Err("bad"));
        errors.push_result(Ok(()));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.into_vec(), vec!["bad"]);
    }

    #[test]
    fn iter_sees_every_error() {
        let errors: ErrorList<u32> = (0..5).collect();
        let seen: HashSet<u32> = errors.iter().copied().collect();
        assert_eq!(seen, (0..5).collect::<HashSet<u32>>());
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn concurrent_pushes_lose_nothing() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 500;

        let errors = ErrorList::new();
        thread::scope(|s| {
            for t in 0..THREADS {
                let errors = &errors;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        errors.push(t * PER_THREAD + i);
                    }
                });
            }
        });

        let mut all = errors.into_vec();
        all.sort_unstable();
        assert_eq!(all, (0..THREADS * PER_THREAD).collect::<Vec<_>>());
    }

    #[test]
    fn iter_during_pushes_sees_growing_snapshots() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;
        const TOTAL: usize = THREADS * PER_THREAD;

        let errors = ErrorList::new();
        let finished = AtomicUsize::new(0);
        thread::scope(|s| {
            for t in 0..THREADS {
                let (errors, finished) = (&errors, &finished);
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        errors.push(t * PER_THREAD + i);
                    }
                    finished.fetch_add(1, Ordering::SeqCst);
                });
            }

            let (errors, finished) = (&errors, &finished);
            s.spawn(move || {
                let mut last = 0;
                loop {
                    let done = finished.load(Ordering::SeqCst) == THREADS;
                    let snapshot: HashSet<usize> = errors.iter().copied().collect();
                    assert!(snapshot.len() >= last, "snapshot shrank from {} to {}", last, snapshot.len());
                    assert!(snapshot.iter().all(|&e| e < TOTAL));
                    last = snapshot.len();
                    if done {
                        assert_eq!(last, TOTAL);
                        break;
                    }
                }
            });
        });

        assert_eq!(errors.len(), TOTAL);
    }

    #[test]
    fn into_result_combines_all() {
        let errors = ErrorList::new();
        errors.push("first".to_string());
        errors.push("second".to_string());

        let combined = errors.into_result().unwrap_err();
        assert_eq!(combined.len(), 2);
        let mut messages = combined.into_errors();
        messages.sort();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn drop_frees_every_error() {
        struct Counted(Arc<AtomicUsize>);
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicUsize::new(0));
        {
            let errors = ErrorList::new();
            for _ in 0..10 {
                errors.push(Counted(Arc::clone(&dropped)));
            }
        }
        assert_eq!(dropped.load(Ordering::SeqCst), 10);
    }
}
