//! # fanout
//!
//! Run a known number of independent units of work concurrently, cap how many
//! run at once, wait for all of them, and get back every error that occurred.
//!
//! This library provides:
//! - A bounded dispatcher over an index range or a list of distinct tasks,
//!   in blocking (scoped threads) and async (tokio) forms
//! - A counting semaphore usable on its own as a concurrency gate
//! - A lock-free error collection that concurrent units append to
//!
//! ## Run Flow
//! 1. Create one semaphore (the cap) and one error collection per run
//! 2. Start one execution per unit; each takes a permit, runs, releases it
//! 3. Failures are pushed onto the error collection, siblings keep running
//! 4. Wait for every unit, then combine the collected errors into one value
//!
//! ## Modules
//! - `dispatch`: Dispatcher, TaskSet, AsyncTaskSet and result slots
//! - `semaphore`: Counting semaphore with scoped and non-blocking acquire
//! - `errors`: ErrorList, MultiError and TaskError
//! - `config`: Default concurrency cap, loaded from the environment

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod semaphore;

pub use config::{Config, ConfigError};
pub use dispatch::{AsyncTaskSet, DispatchResult, Dispatcher, Slots, TaskSet};
pub use errors::{combine, ErrorList, MultiError, TaskError};
pub use semaphore::{Permit, Semaphore};
