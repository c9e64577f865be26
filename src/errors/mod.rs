//! Error collection for concurrent runs.
//!
//! # Key Concepts
//! - ErrorList: lock-free append-only collection shared by concurrent writers
//! - MultiError: the single value a finished collection is combined into
//! - TaskError: a failure tagged with the index of the unit that returned it

mod list;
mod multi;
mod task;

pub use list::{ErrorList, Iter};
pub use multi::{combine, MultiError};
pub use task::TaskError;
