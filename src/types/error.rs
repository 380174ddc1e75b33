//! Error types for the ledger transfer engine
//!
//! Transfer-level conditions are not errors: they come back as
//! [`TransferOutcome`](super::TransferOutcome) values. The types here cover
//! registry operations, the durable store port, and bootstrap I/O.
//!
//! # Error Categories
//!
//! - **Registry Errors**: duplicate or unknown accounts, negative opening balances
//! - **File I/O Errors**: file not found, permission denied, etc.
//! - **CSV Parsing Errors**: malformed rows, invalid data types
//! - **Store Errors**: failures reported by a `DurableStore` implementation

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountId;

/// Errors reported by a durable store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or read
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// The store refused a write for one account
    #[error("store rejected write for account {account}: {message}")]
    Rejected { account: AccountId, message: String },
}

/// Main error type for registry and bootstrap operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// An account with this id is already registered
    #[error("Account {account} already exists")]
    DuplicateAccount { account: AccountId },

    /// Opening balances must not be negative
    #[error("Invalid opening balance {balance} for account {account}")]
    InvalidBalance { account: AccountId, balance: Decimal },

    /// No account with this id is registered
    #[error("Unknown account {account}")]
    UnknownAccount { account: AccountId },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// CSV parsing error occurred
    ///
    /// Row-level parse errors are logged and skipped by the readers; this
    /// variant is returned only when the input cannot be read at all.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError { line: Option<u64>, message: String },

    /// The durable store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    pub fn duplicate_account(account: AccountId) -> Self {
        LedgerError::DuplicateAccount { account }
    }

    pub fn invalid_balance(account: AccountId, balance: Decimal) -> Self {
        LedgerError::InvalidBalance { account, balance }
    }

    pub fn unknown_account(account: AccountId) -> Self {
        LedgerError::UnknownAccount { account }
    }
}
