//! Types module
//!
//! Contains core data structures used throughout the engine.
//! This module organizes types into logical submodules:
//! - `account`: accounts and their guarded balance cells
//! - `transfer`: transfer requests and their shape validation
//! - `outcome`: per-transfer outcomes and batch results
//! - `error`: error types for registry, store and I/O operations

pub mod account;
pub mod error;
pub mod outcome;
pub mod transfer;

pub use account::{Account, AccountId, BalanceCell, BalanceRecord};
pub use error::{LedgerError, StoreError};
pub use outcome::{BatchEntry, BatchResult, FailureCause, OutcomeKind, RejectReason, TransferOutcome};
pub use transfer::{InvalidRequest, Leg, TransferId, TransferRequest};
