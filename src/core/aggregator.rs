//! Collect-all result aggregation
//!
//! Outcomes are folded into a [`BatchResult`] one by one. Nothing short
//! circuits: a rejected or failed transfer is recorded exactly like a
//! committed one, so no outcome can hide another.

use crate::types::{BatchEntry, BatchResult, OutcomeKind, TransferOutcome, TransferRequest};

#[derive(Debug, Default)]
pub struct ResultAggregator {
    result: BatchResult,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            result: BatchResult {
                entries: Vec::with_capacity(capacity),
                ..BatchResult::default()
            },
        }
    }

    /// Record one request's outcome
    pub fn record(&mut self, request: TransferRequest, outcome: TransferOutcome) {
        match outcome.kind() {
            OutcomeKind::Committed => self.result.committed += 1,
            OutcomeKind::Rejected => self.result.rejected += 1,
            OutcomeKind::Failed => self.result.failed += 1,
        }
        self.result.entries.push(BatchEntry { request, outcome });
    }

    /// Number of outcomes recorded so far
    pub fn len(&self) -> usize {
        self.result.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.result.entries.is_empty()
    }

    pub fn finish(self) -> BatchResult {
        self.result
    }

    /// Fold a sequence of `(request, outcome)` pairs into a batch result
    pub fn aggregate<I>(pairs: I) -> BatchResult
    where
        I: IntoIterator<Item = (TransferRequest, TransferOutcome)>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |mut aggregator, (request, outcome)| {
                aggregator.record(request, outcome);
                aggregator
            })
            .finish()
    }
}
