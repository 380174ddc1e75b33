//! Processing strategy module for transfer batches
//!
//! This module defines the Strategy pattern for complete processing pipelines:
//! loading opening balances, reading transfer requests, running them through
//! the engine, and writing the final balances. Different execution models
//! (sequential, concurrent batches) can be selected at runtime.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use crate::cli::StrategyType;
use crate::config::EngineConfig;
use crate::core::{AccountRegistry, DurableStore, InMemoryStore, TransferCoordinator};
use crate::io::read_accounts;
use crate::types::{AccountId, BatchResult, LedgerError};

pub mod r#async;
pub mod sync;

pub use self::r#async::AsyncProcessingStrategy;
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete transfer pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Apply every transfer in `transfers_path` to the balances in `accounts_path`
    ///
    /// Final balances are written to `output` as CSV, sorted by account id.
    /// The returned `BatchResult` holds one outcome per transfer request.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either input file cannot be opened
    /// - The accounts file holds a duplicate or negative opening balance
    /// - The async runtime cannot be started
    /// - Output cannot be written
    ///
    /// Rejected and failed transfers are not errors; they are reported in the
    /// returned `BatchResult`.
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
    ) -> Result<BatchResult, LedgerError>;
}

/// Load opening balances and wire a coordinator around them
///
/// Balances go through an `InMemoryStore` so the registry is built the same
/// way it would be from any other durable store.
pub(crate) async fn bootstrap(
    accounts_path: &Path,
    config: &EngineConfig,
) -> Result<Arc<TransferCoordinator>, LedgerError> {
    let balances = read_accounts(accounts_path)?;
    let store: Arc<dyn DurableStore> = Arc::new(InMemoryStore::from_balances(balances));
    let registry = Arc::new(AccountRegistry::load_from(store.as_ref()).await?);

    info!(accounts = registry.len(), "registry loaded");

    Ok(Arc::new(
        TransferCoordinator::new(registry, store).with_lock_timeout(config.lock_timeout),
    ))
}

pub(crate) fn log_summary(result: &BatchResult, balances: &BTreeMap<AccountId, Decimal>) {
    info!(
        transfers = result.len(),
        committed = result.committed(),
        rejected = result.rejected(),
        failed = result.failed(),
        accounts = balances.len(),
        "processing complete"
    );
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Engine configuration; the sync strategy only uses the lock timeout
pub fn create_strategy(
    strategy_type: StrategyType,
    config: EngineConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(config)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(config)),
    }
}
