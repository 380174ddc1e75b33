//! Sequential processing strategy
//!
//! Runs transfers one after another, in file order, on a single-threaded
//! runtime. Every transfer still goes through the `TransferCoordinator`, so
//! the outcome of each request is the same as under the concurrent strategy
//! whenever the requests do not compete for the same funds.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `io::read_accounts` / `io::read_transfers`
//! - Transfer execution to `TransferCoordinator`
//! - Outcome collection to `ResultAggregator`
//! - CSV output to `csv_format::write_balances_csv`

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::config::EngineConfig;
use crate::core::ResultAggregator;
use crate::io::{read_transfers, write_balances_csv};
use crate::strategy::{bootstrap, log_summary, ProcessingStrategy};
use crate::types::{BatchResult, LedgerError};

/// Sequential processing strategy
///
/// # Examples
///
/// ```no_run
/// use ledger_transfer_engine::config::EngineConfig;
/// use ledger_transfer_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(EngineConfig::default());
/// let mut output = io::stdout();
///
/// let result = strategy
///     .process(Path::new("accounts.csv"), Path::new("transfers.csv"), &mut output)
///     .expect("Processing failed");
/// println!("{} committed", result.committed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    config: EngineConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
    ) -> Result<BatchResult, LedgerError> {
        // Timers are needed for the lock timeout
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let coordinator = bootstrap(accounts_path, &self.config).await?;
            let requests = read_transfers(transfers_path)?;

            let mut aggregator = ResultAggregator::with_capacity(requests.len());
            for request in requests {
                let outcome = coordinator.execute(&request).await;
                debug!(transfer = request.id(), outcome = outcome.kind().as_str(), "transfer done");
                aggregator.record(request, outcome);
            }
            let result = aggregator.finish();

            let balances = coordinator.registry().snapshot().await;
            write_balances_csv(&balances, output)?;
            log_summary(&result, &balances);

            Ok::<_, LedgerError>(result)
        })
    }
}
