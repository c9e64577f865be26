//! Pre-sized per-index result container.

use std::fmt;
use std::sync::OnceLock;

/// One write-once cell per task index.
///
/// Concurrent units each write their own index through `&Slots`, so no lock is
/// needed around the container.
///
/// # Invariants
/// - `len()` is fixed at construction
/// - each cell is written at most once
pub struct Slots<T> {
    cells: Box<[OnceLock<T>]>,
}

impl<T> Slots<T> {
    /// Create `len` empty cells.
    pub fn new(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Store `value` at `index`.
    ///
    /// # Errors
    /// Gives `value` back if the cell was already written.
    ///
    /// # Panics
    /// Panics if `index >= len()`.
    pub fn set(&self, index: usize, value: T) -> Result<(), T> {
        self.cells[index].set(value)
    }

    /// Value at `index`, if written. `None` as well for out-of-range indices.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.cells.get(index).and_then(OnceLock::get)
    }

    /// Every cell in index order.
    pub fn into_vec(self) -> Vec<Option<T>> {
        self.cells
            .into_vec()
            .into_iter()
            .map(OnceLock::into_inner)
            .collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for Slots<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.cells.iter().map(OnceLock::get))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn cells_are_write_once() {
        let slots = Slots::new(2);
        assert_eq!(slots.set(0, "a"), Ok(()));
        assert_eq!(slots.set(0, "b"), Err("b"));
        assert_eq!(slots.get(0), Some(&"a"));
        assert_eq!(slots.get(1), None);
        assert_eq!(slots.get(9), None);
        assert_eq!(slots.into_vec(), vec![Some("a"), None]);
    }

    #[test]
    fn disjoint_writers_need_no_lock() {
        let slots = Slots::new(32);
        thread::scope(|s| {
            for i in 0..32 {
                let slots = &slots;
                s.spawn(move || slots.set(i, i * i).unwrap());
            }
        });
        let values: Vec<usize> = slots.into_vec().into_iter().map(Option::unwrap).collect();
        assert_eq!(values, (0..32).map(|i| i * i).collect::<Vec<_>>());
    }
}
