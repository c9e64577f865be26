//! Configuration for fanout.
//!
//! Configuration can be set via environment variables:
//! - `FANOUT_MAX_PARALLEL` - Optional. Default concurrency cap for runs that do
//!   not pass their own. Defaults to the host's available parallelism.
//!
//! The library never reads the environment on its own; callers load a
//! [`Config`] once and hand it to [`crate::Dispatcher::from_config`].

use std::num::NonZeroUsize;
use thiserror::Error;

const MAX_PARALLEL_VAR: &str = "FANOUT_MAX_PARALLEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Concurrency cap used when a run does not supply one
    pub max_parallel: NonZeroUsize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `FANOUT_MAX_PARALLEL` is set but
    /// is not an integer of at least 1.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create a config with a fixed cap (useful for testing).
    pub fn new(max_parallel: NonZeroUsize) -> Self {
        Self { max_parallel }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_parallel = match lookup(MAX_PARALLEL_VAR) {
            Some(raw) => raw.trim().parse::<NonZeroUsize>().map_err(|e| {
                ConfigError::InvalidValue(MAX_PARALLEL_VAR.to_string(), format!("{}: {:?}", e, raw))
            })?,
            None => host_parallelism(),
        };

        Ok(Self { max_parallel })
    }
}

/// Parallelism the host reports, or 1 if it cannot be determined.
pub fn host_parallelism() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
