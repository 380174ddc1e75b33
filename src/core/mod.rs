//! Core engine module
//!
//! This module contains the transfer engine components, leaf-first:
//! - `registry` - Account ownership and lookup
//! - `lock_order` - Canonical lock acquisition order
//! - `coordinator` - Atomic execution of a single transfer
//! - `batch_executor` - Concurrent execution of many transfers
//! - `aggregator` - Collect-all folding of outcomes into a batch result
//! - `traits` - Ports the engine consumes (durable store)
//! - `store` - In-memory durable store

pub mod aggregator;
pub mod batch_executor;
pub mod coordinator;
pub mod lock_order;
pub mod registry;
pub mod store;
pub mod traits;

pub use aggregator::ResultAggregator;
pub use batch_executor::BatchExecutor;
pub use coordinator::TransferCoordinator;
pub use lock_order::LockOrderingPolicy;
pub use registry::AccountRegistry;
pub use store::InMemoryStore;
pub use traits::DurableStore;
