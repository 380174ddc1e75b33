//! Account ownership and lookup
//!
//! The `AccountRegistry` exclusively owns every [`Account`]. Accounts live in
//! a `DashMap` keyed by id and are handed out as `Arc<Account>`, so callers
//! borrow the exclusion primitive without ever owning the account.
//!
//! # Thread Safety
//!
//! Lookups and registrations go through DashMap's sharded locks and never
//! touch an account's own mutex. Only `snapshot` and `total_balance` lock
//! accounts, one at a time, so reads never hold more than one account's
//! critical section.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use super::lock_order::LockOrderingPolicy;
use super::traits::DurableStore;
use crate::types::{Account, AccountId, LedgerError};

#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: DashMap<AccountId, Arc<Account>>,
}

impl AccountRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the balances a durable store holds
    ///
    /// # Errors
    ///
    /// * `LedgerError::Store` if the store cannot be read
    /// * `LedgerError::InvalidBalance` if a stored balance is negative
    pub async fn load_from(store: &dyn DurableStore) -> Result<Self, LedgerError> {
        let balances = store.load().await?;
        let registry = Self::new();

        for (id, balance) in balances {
            registry.create(id, balance)?;
        }

        debug!(accounts = registry.len(), "registry loaded from store");
        Ok(registry)
    }

    /// Register a new account
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidBalance` if `initial_balance` is negative
    /// * `LedgerError::DuplicateAccount` if `id` is already registered
    pub fn create(&self, id: AccountId, initial_balance: Decimal) -> Result<Arc<Account>, LedgerError> {
        if initial_balance < Decimal::ZERO {
            return Err(LedgerError::invalid_balance(id, initial_balance));
        }

        match self.accounts.entry(id) {
            Entry::Occupied(_) => Err(LedgerError::duplicate_account(id)),
            Entry::Vacant(slot) => {
                let account = Arc::new(Account::new(id, initial_balance));
                slot.insert(Arc::clone(&account));
                Ok(account)
            }
        }
    }

    /// Look up an account by id
    ///
    /// # Errors
    ///
    /// * `LedgerError::UnknownAccount` if no account has this id
    pub fn get(&self, id: AccountId) -> Result<Arc<Account>, LedgerError> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::unknown_account(id))
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Best-effort point-in-time view of every balance
    ///
    /// Each account is locked and released individually, with no global
    /// lock, so a transfer that commits while the snapshot is being taken may
    /// be reflected for some of its accounts and not others. Use it for
    /// diagnostics and for reading results once the engine is quiescent.
    pub async fn snapshot(&self) -> BTreeMap<AccountId, Decimal> {
        let mut snapshot = BTreeMap::new();
        for account in self.accounts_by_id() {
            snapshot.insert(account.id(), account.balance().await);
        }
        snapshot
    }

    /// Sum of every balance, with the same consistency caveat as `snapshot`
    pub async fn total_balance(&self) -> Decimal {
        let mut total = Decimal::ZERO;
        for account in self.accounts_by_id() {
            total += account.balance().await;
        }
        total
    }

    // Clone the handles out first so no DashMap shard guard is held across an await.
    fn accounts_by_id(&self) -> Vec<Arc<Account>> {
        let accounts: Vec<Arc<Account>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        LockOrderingPolicy::order_by_key(accounts, |account| account.id())
    }
}
