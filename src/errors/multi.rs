//! Combining several errors into one value.

use std::error::Error;
use std::fmt;

/// One or more errors reported as a single value.
///
/// # Invariants
/// - holds at least one error (only [`combine`] constructs it)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiError<E> {
    errors: Vec<E>,
}

/// Combine `errors` into one value.
///
/// # Returns
/// `None` for an empty input, otherwise a [`MultiError`] holding every error
/// in the order given.
pub fn combine<E>(errors: Vec<E>) -> Option<MultiError<E>> {
    if errors.is_empty() {
        None
    } else {
        Some(MultiError { errors })
    }
}

impl<E> MultiError<E> {
    /// Number of errors combined. Always at least 1.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }
}

impl<E: fmt::Display> fmt::Display for MultiError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.errors.as_slice() {
            return write!(f, "{}", only);
        }
        write!(f, "{} errors occurred: ", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

// Each error is already part of the message; no single `source` exists.
impl<E: Error + 'static> Error for MultiError<E> {}

impl<E> IntoIterator for MultiError<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a MultiError<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
