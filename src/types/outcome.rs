//! Transfer outcomes and batch results
//!
//! Expected business conditions are returned as data, never raised: a
//! [`TransferOutcome`] is produced exactly once per request and a
//! [`BatchResult`] keeps every one of them.

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::{AccountId, BalanceRecord};
use super::transfer::{InvalidRequest, TransferId, TransferRequest};

/// Why a transfer was rejected without mutating anything
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// A debit would take an account below zero
    #[error("insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    /// The request references an account the registry does not know
    #[error("unknown account {account}")]
    UnknownAccount { account: AccountId },

    /// The request is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequest),
}

/// Unexpected or resource failures surfaced as outcomes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    /// The deadline elapsed while waiting for an account's lock
    #[error("timed out waiting for account {account}")]
    Timeout { account: AccountId },

    /// The commit was applied in memory but could not be persisted
    #[error("failed to persist account {account}: {message}")]
    Persistence { account: AccountId, message: String },

    /// Applying a credit would exceed the decimal range
    #[error("balance overflow in account {account}")]
    Overflow { account: AccountId },

    /// The worker running this transfer went away before reporting
    #[error("worker stopped before reporting an outcome")]
    WorkerLost,
}

/// The result of executing one transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Every delta was applied; post-transfer balances in lock order
    Committed(Vec<BalanceRecord>),

    /// Nothing was applied
    Rejected(RejectReason),

    /// An unexpected or resource failure
    Failed(FailureCause),
}

impl TransferOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            TransferOutcome::Committed(_) => OutcomeKind::Committed,
            TransferOutcome::Rejected(_) => OutcomeKind::Rejected,
            TransferOutcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, TransferOutcome::Committed(_))
    }
}

/// Outcome category, used for tallies and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Committed,
    Rejected,
    Failed,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Committed => "committed",
            OutcomeKind::Rejected => "rejected",
            OutcomeKind::Failed => "failed",
        }
    }
}

/// A request paired with the outcome it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub request: TransferRequest,
    pub outcome: TransferOutcome,
}

/// Every outcome of a batch, with per-kind counts
///
/// Entries are in completion order, which need not match submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub(crate) entries: Vec<BatchEntry>,
    pub(crate) committed: usize,
    pub(crate) rejected: usize,
    pub(crate) failed: usize,
}

impl BatchResult {
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<BatchEntry> {
        self.entries
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the outcome recorded for a transfer id
    pub fn outcome_of(&self, id: TransferId) -> Option<&TransferOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.request.id() == id)
            .map(|entry| &entry.outcome)
    }

    /// Append another batch's entries and counts
    pub fn merge(&mut self, other: BatchResult) {
        self.committed += other.committed;
        self.rejected += other.rejected;
        self.failed += other.failed;
        self.entries.extend(other.entries);
    }
}
