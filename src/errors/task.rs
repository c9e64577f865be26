//! A task failure tagged with the index of the unit that produced it.

use std::error::Error;
use std::fmt;

/// Error returned by the task running at `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError<E> {
    pub index: usize,
    pub source: E,
}

impl<E> TaskError<E> {
    pub fn new(index: usize, source: E) -> Self {
        Self { index, source }
    }

    /// Drop the index and keep the task's own error.
    pub fn into_source(self) -> E {
        self.source
    }
}

impl<E: fmt::Display> fmt::Display for TaskError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {}: {}", self.index, self.source)
    }
}

impl<E: Error + 'static> Error for TaskError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_index() {
        let err = TaskError::new(4, std::io::Error::new(std::io::ErrorKind::Other, "nope"));
        assert_eq!(err.to_string(), "task 4: nope");
        assert!(err.source().is_some());
        assert_eq!(err.into_source().to_string(), "nope");
    }
}
