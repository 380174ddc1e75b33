//! Ports the engine consumes
//!
//! The engine never talks to persistence directly. It goes through
//! [`DurableStore`], which can be backed by memory, a file, or a database.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{AccountId, BalanceRecord, StoreError};

/// Durable backing for account balances
///
/// `load` is called once at startup to seed the registry. `persist` is called
/// by the coordinator after each commit, outside every account's critical
/// section. Because of that, two commits on the same account can reach the
/// store in either order; implementations should keep the record with the
/// highest `version`.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Read every stored balance
    async fn load(&self) -> Result<HashMap<AccountId, Decimal>, StoreError>;

    /// Record a committed balance
    async fn persist(&self, record: &BalanceRecord) -> Result<(), StoreError>;
}
