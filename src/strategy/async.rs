//! Concurrent batch processing strategy
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── EngineConfig (concurrency_limit, batch_size, lock_timeout)
//!     ├── read_transfers (CSV legs grouped into requests)
//!     ├── BatchExecutor (work queue + bounded worker tasks)
//!     └── TransferCoordinator (per-account locks in ascending id order)
//!         └── AccountRegistry (DashMap of Arc<Account>)
//! ```
//!
//! Requests are submitted to the executor `batch_size` at a time. Batches run
//! one after another; within a batch up to `concurrency_limit` transfers are
//! in flight at once. Transfers touching disjoint accounts proceed in
//! parallel, and transfers sharing an account serialize on that account's
//! lock. Only the final balances are deterministic when batch members compete
//! for the same funds.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::config::EngineConfig;
use crate::core::BatchExecutor;
use crate::io::{read_transfers, write_balances_csv};
use crate::strategy::{bootstrap, log_summary, ProcessingStrategy};
use crate::types::{BatchResult, LedgerError};

/// Concurrent batch processing strategy
///
/// # Configuration
///
/// - `concurrency_limit`: worker threads and in-flight transfers (default: CPU cores)
/// - `batch_size`: requests per executor run (default: 1000)
/// - `lock_timeout`: per-transfer lock deadline (default: none)
#[derive(Debug, Clone, Default)]
pub struct AsyncProcessingStrategy {
    config: EngineConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
    ) -> Result<BatchResult, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.concurrency_limit.max(1))
            .enable_time()
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let coordinator = bootstrap(accounts_path, &self.config).await?;
            let executor = BatchExecutor::new(coordinator);
            let requests = read_transfers(transfers_path)?;

            let mut result = BatchResult::default();
            let mut pending = requests.into_iter();
            loop {
                let batch: Vec<_> = pending.by_ref().take(self.config.batch_size.max(1)).collect();
                if batch.is_empty() {
                    break;
                }

                debug!(size = batch.len(), "submitting batch");
                result.merge(executor.run(batch, self.config.concurrency_limit).await);
            }

            let balances = executor.coordinator().registry().snapshot().await;
            write_balances_csv(&balances, output)?;
            log_summary(&result, &balances);

            Ok::<_, LedgerError>(result)
        })
    }
}
