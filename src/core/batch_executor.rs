//! Concurrent batch execution with a bounded worker pool
//!
//! The `BatchExecutor` pushes every request of a batch onto a shared queue
//! and spawns at most `concurrency_limit` worker tasks that drain it. Each
//! worker hands one request at a time to the [`TransferCoordinator`] and
//! reports the outcome over a channel, so outcomes arrive in completion order
//! and are folded by the [`ResultAggregator`] as they come in.
//!
//! # Architecture
//!
//! ```text
//! BatchExecutor::run
//!     ├── SegQueue<TransferRequest>   (pending requests)
//!     ├── JoinSet of N worker tasks   (N = min(concurrency_limit, batch size))
//!     │     └── TransferCoordinator::execute
//!     └── mpsc channel ──► ResultAggregator ──► BatchResult
//! ```
//!
//! # Failure Isolation
//!
//! A rejected or failed transfer is just another outcome; the worker moves
//! on to the next request. The only thing that crosses unit boundaries is a
//! panic, which signals a broken engine invariant: it is re-raised on the
//! caller once the other workers have finished.

use std::sync::Arc;

use crossbeam_queue::SegQueue;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, trace};

use super::aggregator::ResultAggregator;
use super::coordinator::TransferCoordinator;
use crate::types::{BatchResult, FailureCause, TransferOutcome, TransferRequest};

type Completed = (TransferRequest, TransferOutcome);

#[derive(Debug, Clone)]
pub struct BatchExecutor {
    coordinator: Arc<TransferCoordinator>,
}

impl BatchExecutor {
    pub fn new(coordinator: Arc<TransferCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<TransferCoordinator> {
        &self.coordinator
    }

    /// Execute every request concurrently and collect one outcome per request
    ///
    /// At most `concurrency_limit` transfers are in flight at once; a limit of
    /// zero is treated as one. Returns only after every request has produced
    /// its outcome. Entries in the result are in completion order.
    ///
    /// # Cancellation
    ///
    /// Workers are owned by the returned future. Dropping it before it
    /// completes aborts every worker at its next await point: a transfer still
    /// waiting for locks releases them and applies nothing, and a transfer
    /// already persisting keeps its in-memory commit without an outcome.
    ///
    /// # Panics
    ///
    /// Re-raises a worker's panic after the remaining workers have finished.
    pub async fn run(&self, requests: Vec<TransferRequest>, concurrency_limit: usize) -> BatchResult {
        let submitted = requests.len();
        let workers = concurrency_limit.max(1).min(submitted);
        info!(submitted, workers, "batch started");

        let queue = Arc::new(SegQueue::new());
        for request in requests {
            queue.push(request);
        }

        let (results_tx, mut results_rx) = mpsc::unbounded_channel::<Completed>();
        let mut handles = JoinSet::new();
        for worker in 0..workers {
            handles.spawn(work(
                worker,
                Arc::clone(&self.coordinator),
                Arc::clone(&queue),
                results_tx.clone(),
            ));
        }
        drop(results_tx);

        let mut aggregator = ResultAggregator::with_capacity(submitted);
        while let Some((request, outcome)) = results_rx.recv().await {
            aggregator.record(request, outcome);
        }

        while let Some(joined) = handles.join_next().await {
            if let Err(join_error) = joined {
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
                error!(error = %join_error, "batch worker stopped early");
            }
        }

        // Only reachable if a worker was cancelled before draining the queue.
        while let Some(request) = queue.pop() {
            aggregator.record(request, TransferOutcome::Failed(FailureCause::WorkerLost));
        }

        let result = aggregator.finish();
        debug_assert_eq!(result.len(), submitted, "every request yields one outcome");
        info!(
            submitted,
            committed = result.committed(),
            rejected = result.rejected(),
            failed = result.failed(),
            "batch finished"
        );
        result
    }
}

async fn work(
    worker: usize,
    coordinator: Arc<TransferCoordinator>,
    queue: Arc<SegQueue<TransferRequest>>,
    results: mpsc::UnboundedSender<Completed>,
) {
    let mut executed = 0usize;
    while let Some(request) = queue.pop() {
        let outcome = coordinator.execute(&request).await;
        executed += 1;
        if results.send((request, outcome)).is_err() {
            break;
        }
    }
    trace!(worker, executed, "worker drained queue");
}
