//! In-memory durable store
//!
//! `InMemoryStore` keeps the latest committed [`BalanceRecord`] per account in
//! a `DashMap`. Writes carrying an older version than the stored one are
//! dropped, so the store converges on the newest balance regardless of the
//! order in which post-commit persists arrive.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::trace;

use super::traits::DurableStore;
use crate::types::{AccountId, BalanceRecord, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<AccountId, BalanceRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with opening balances at version 0
    pub fn from_balances(balances: impl IntoIterator<Item = (AccountId, Decimal)>) -> Self {
        let records = balances
            .into_iter()
            .map(|(account, balance)| {
                (
                    account,
                    BalanceRecord {
                        account,
                        balance,
                        version: 0,
                    },
                )
            })
            .collect();

        Self { records }
    }

    /// The latest record stored for an account
    pub fn get(&self, account: AccountId) -> Option<BalanceRecord> {
        self.records.get(&account).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn load(&self) -> Result<HashMap<AccountId, Decimal>, StoreError> {
        Ok(self
            .records
            .iter()
            .map(|entry| (*entry.key(), entry.value().balance))
            .collect())
    }

    async fn persist(&self, record: &BalanceRecord) -> Result<(), StoreError> {
        let mut entry = self.records.entry(record.account).or_insert(*record);
        if record.version > entry.version {
            *entry = *record;
        } else if record.version < entry.version {
            trace!(
                account = record.account,
                version = record.version,
                stored = entry.version,
                "dropping stale balance write"
            );
        }
        Ok(())
    }
}
