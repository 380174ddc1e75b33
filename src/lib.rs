//! Ledger Transfer Engine Library
//! # Overview
//!
//! This library applies atomic, multi-account value transfers to a ledger of
//! account balances, many at a time, without deadlocking and without ever
//! letting a balance go negative.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, TransferRequest, TransferOutcome, etc.)
//! - [`core`] - The transfer engine:
//!   - [`core::registry`] - Account ownership and lookup
//!   - [`core::lock_order`] - Canonical lock acquisition order
//!   - [`core::coordinator`] - Atomic execution of one transfer
//!   - [`core::batch_executor`] - Bounded concurrent execution of many transfers
//!   - [`core::aggregator`] - Outcome collection
//!   - [`core::traits`] - The durable store port
//! - [`io`] - CSV input and output
//! - [`strategy`] - Sequential and concurrent processing pipelines
//! - [`cli`] - CLI arguments parsing
//! - [`config`] / [`logging`] - Engine configuration and log setup
//!
//! # Transfer Semantics
//!
//! A transfer is a list of `(account, delta)` legs whose deltas sum to zero.
//! It commits all of its legs or none of them:
//!
//! - **Committed**: every leg applied, new balances returned
//! - **Rejected**: an expected business condition (insufficient funds,
//!   unknown account, malformed request); no balance changed
//! - **Failed**: an infrastructure problem (lock timeout, persistence,
//!   arithmetic overflow)
//!
//! Locks are always taken in ascending account id order, which rules out
//! deadlock between transfers sharing accounts.

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use config::EngineConfig;
pub use core::{
    AccountRegistry, BatchExecutor, DurableStore, InMemoryStore, LockOrderingPolicy,
    ResultAggregator, TransferCoordinator,
};
pub use io::{write_balances_csv, write_report_csv};
pub use types::{
    Account, AccountId, BalanceRecord, BatchResult, FailureCause, InvalidRequest, LedgerError,
    Leg, RejectReason, StoreError, TransferId, TransferOutcome, TransferRequest,
};
