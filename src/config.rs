//! Engine configuration
//!
//! Controls how many transfers run concurrently, how many requests are
//! handed to the batch executor at once, and how long a transfer may wait for
//! an account lock.

use std::time::Duration;

use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of transfers in flight at once
    pub concurrency_limit: usize,
    /// Number of requests submitted to the executor per batch
    pub batch_size: usize,
    /// How long a transfer may wait for its locks; `None` waits indefinitely
    pub lock_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: num_cpus::get(),
            batch_size: 1000,
            lock_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Create a config, replacing zero values with the defaults
    pub fn new(concurrency_limit: usize, batch_size: usize, lock_timeout: Option<Duration>) -> Self {
        let default = Self::default();

        let concurrency_limit = if concurrency_limit == 0 {
            warn!(
                "Invalid concurrency_limit ({}), using default ({})",
                concurrency_limit, default.concurrency_limit
            );
            default.concurrency_limit
        } else {
            concurrency_limit
        };

        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size, default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let lock_timeout = match lock_timeout {
            Some(timeout) if timeout.is_zero() => {
                warn!("Zero lock timeout would fail every contended transfer, waiting indefinitely instead");
                None
            }
            other => other,
        };

        Self {
            concurrency_limit,
            batch_size,
            lock_timeout,
        }
    }
}
