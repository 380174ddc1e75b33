//! Account-related types for the ledger transfer engine
//!
//! An [`Account`] is a uniquely identified balance cell that owns its own
//! exclusion primitive. The balance is never reachable without holding that
//! primitive, so the only way to read or write it is through a lock guard.

use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard};

/// Account identifier
///
/// Identifiers are unique and totally ordered, which is what the lock
/// ordering policy relies on.
pub type AccountId = u64;

/// Balance state guarded by an account's mutex
///
/// `version` is bumped on every committed mutation and travels with the
/// balance to the durable store so out-of-order writes can be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCell {
    pub balance: Decimal,
    pub version: u64,
}

/// A named, ordered, mutable balance cell with its own exclusion primitive
///
/// Accounts are created by the [`AccountRegistry`](crate::core::AccountRegistry)
/// and shared behind `Arc`. They are never destroyed while the registry is alive.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    cell: Mutex<BalanceCell>,
}

impl Account {
    /// Create an account with the given opening balance
    ///
    /// Callers are expected to have rejected negative balances already; the
    /// registry does so with `LedgerError::InvalidBalance`.
    pub(crate) fn new(id: AccountId, balance: Decimal) -> Self {
        Self {
            id,
            cell: Mutex::new(BalanceCell {
                balance,
                version: 0,
            }),
        }
    }

    /// The account's identifier
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Read the current balance
    ///
    /// Acquires the account's mutex for the duration of the read only.
    pub async fn balance(&self) -> Decimal {
        self.cell.lock().await.balance
    }

    /// Read balance and commit version together
    pub async fn state(&self) -> BalanceCell {
        *self.cell.lock().await
    }

    /// Acquire exclusive access to the balance cell
    pub(crate) async fn lock(&self) -> MutexGuard<'_, BalanceCell> {
        self.cell.lock().await
    }

    #[cfg(test)]
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, BalanceCell>> {
        self.cell.try_lock().ok()
    }
}

/// A committed balance for one account, as handed to the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceRecord {
    /// The account this balance belongs to
    pub account: AccountId,

    /// Balance immediately after the commit
    pub balance: Decimal,

    /// Commit version of the account after the commit
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_new_account_starts_at_version_zero() {
        let account = Account::new(7, dec!(12.5));

        assert_eq!(account.id(), 7);
        assert_eq!(account.balance().await, dec!(12.5));
        assert_eq!(account.state().await.version, 0);
    }

    #[tokio::test]
    async fn test_balance_read_releases_lock() {
        let account = Account::new(1, dec!(1));

        let _ = account.balance().await;

        assert!(account.try_lock().is_some());
    }
}
