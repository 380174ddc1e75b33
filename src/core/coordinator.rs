//! Single-transfer execution
//!
//! The `TransferCoordinator` runs one [`TransferRequest`] to completion:
//!
//! 1. Validate the request's shape (no account is touched on failure)
//! 2. Resolve every account through the [`AccountRegistry`]
//! 3. Order the accounts with the [`LockOrderingPolicy`]
//! 4. Acquire every account's mutex in that order, in one monotonic pass
//! 5. Check every resulting balance stays non-negative, before mutating
//! 6. Apply every delta
//! 7. Release every mutex in reverse acquisition order
//! 8. Persist the new balances, outside any critical section
//!
//! # Deadlock Freedom
//!
//! All coordinators acquire overlapping accounts in the same total order, so
//! the wait-for graph can never contain a cycle. A coordinator never backs
//! off and retries while holding a partial set of locks.
//!
//! # Release Discipline
//!
//! Acquired guards live in a `HeldLocks` set whose `Drop` releases them in
//! reverse order. Early returns (rejection, timeout) and panics all go
//! through that same path.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::MutexGuard;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};

use super::lock_order::LockOrderingPolicy;
use super::registry::AccountRegistry;
use super::traits::DurableStore;
use crate::types::{
    Account, AccountId, BalanceCell, BalanceRecord, FailureCause, RejectReason, TransferOutcome,
    TransferRequest,
};

/// An account resolved from the registry with the delta to apply to it
#[derive(Debug)]
struct ResolvedLeg {
    account: Arc<Account>,
    delta: Decimal,
}

/// Guards for every account a transfer holds, in acquisition order
struct HeldLocks<'a> {
    guards: Vec<(AccountId, MutexGuard<'a, BalanceCell>)>,
}

impl<'a> HeldLocks<'a> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            guards: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, account: AccountId, guard: MutexGuard<'a, BalanceCell>) {
        if let Some((last, _)) = self.guards.last() {
            assert!(
                *last < account,
                "lock order violated: account {account} acquired after {last}"
            );
        }
        assert!(
            guard.balance >= Decimal::ZERO,
            "account {account} holds a negative balance {}",
            guard.balance
        );
        trace!(account, "lock acquired");
        self.guards.push((account, guard));
    }

    fn len(&self) -> usize {
        self.guards.len()
    }
}

impl Drop for HeldLocks<'_> {
    fn drop(&mut self) {
        while let Some((account, guard)) = self.guards.pop() {
            drop(guard);
            trace!(account, "lock released");
        }
    }
}

/// Executes transfers against the accounts of one registry
pub struct TransferCoordinator {
    registry: Arc<AccountRegistry>,
    store: Arc<dyn DurableStore>,
    lock_timeout: Option<Duration>,
}

impl TransferCoordinator {
    /// Create a coordinator with no default lock timeout
    pub fn new(registry: Arc<AccountRegistry>, store: Arc<dyn DurableStore>) -> Self {
        Self {
            registry,
            store,
            lock_timeout: None,
        }
    }

    /// Set the deadline `execute` attaches to each transfer, measured from its start
    pub fn with_lock_timeout(mut self, lock_timeout: Option<Duration>) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    /// Execute a transfer using the coordinator's default lock timeout
    pub async fn execute(&self, request: &TransferRequest) -> TransferOutcome {
        let deadline = self.lock_timeout.map(|timeout| Instant::now() + timeout);
        self.run(request, deadline).await
    }

    /// Execute a transfer, giving up on lock acquisition once `deadline` passes
    ///
    /// On timeout every lock already taken is released and the outcome is
    /// `Failed(Timeout)`; no account is mutated.
    pub async fn execute_with_deadline(
        &self,
        request: &TransferRequest,
        deadline: Instant,
    ) -> TransferOutcome {
        self.run(request, Some(deadline)).await
    }

    async fn run(&self, request: &TransferRequest, deadline: Option<Instant>) -> TransferOutcome {
        if let Err(invalid) = request.validate() {
            debug!(transfer = request.id(), reason = %invalid, "transfer rejected");
            return TransferOutcome::Rejected(invalid.into());
        }

        let legs = match self.resolve(request) {
            Ok(legs) => legs,
            Err(account) => {
                debug!(transfer = request.id(), account, "transfer references unknown account");
                return TransferOutcome::Rejected(RejectReason::UnknownAccount { account });
            }
        };

        let records = match self.commit(&legs, deadline).await {
            Ok(records) => records,
            Err(outcome) => {
                debug!(transfer = request.id(), ?outcome, "transfer not applied");
                return outcome;
            }
        };
        debug!(transfer = request.id(), accounts = records.len(), "transfer committed");

        if let Err(cause) = self.persist(&records).await {
            return TransferOutcome::Failed(cause);
        }

        TransferOutcome::Committed(records)
    }

    /// Resolve every leg's account, returned in canonical lock order
    fn resolve(&self, request: &TransferRequest) -> Result<Vec<ResolvedLeg>, AccountId> {
        let legs = request
            .legs()
            .iter()
            .map(|leg| {
                let account = self.registry.get(leg.account).map_err(|_| leg.account)?;
                Ok(ResolvedLeg {
                    account,
                    delta: leg.delta,
                })
            })
            .collect::<Result<Vec<_>, AccountId>>()?;

        Ok(LockOrderingPolicy::order_by_key(legs, |leg| leg.account.id()))
    }

    /// Lock, check and apply. Every lock is released before this returns.
    async fn commit(
        &self,
        legs: &[ResolvedLeg],
        deadline: Option<Instant>,
    ) -> Result<Vec<BalanceRecord>, TransferOutcome> {
        let mut held = HeldLocks::with_capacity(legs.len());

        for leg in legs {
            let account = leg.account.id();
            let guard = match deadline {
                Some(deadline) => match timeout_at(deadline, leg.account.lock()).await {
                    Ok(guard) => guard,
                    Err(_) => {
                        warn!(account, held = held.len(), "timed out waiting for account lock");
                        return Err(TransferOutcome::Failed(FailureCause::Timeout { account }));
                    }
                },
                None => leg.account.lock().await,
            };
            held.push(account, guard);
        }

        // Stage every new balance first so a failed check leaves nothing applied.
        let mut staged = Vec::with_capacity(legs.len());
        for (leg, (account, cell)) in legs.iter().zip(held.guards.iter()) {
            let next = cell.balance.checked_add(leg.delta).ok_or(TransferOutcome::Failed(
                FailureCause::Overflow { account: *account },
            ))?;
            if next < Decimal::ZERO {
                return Err(TransferOutcome::Rejected(RejectReason::InsufficientFunds {
                    account: *account,
                    balance: cell.balance,
                    requested: -leg.delta,
                }));
            }
            staged.push(next);
        }

        let records: Vec<BalanceRecord> = held
            .guards
            .iter_mut()
            .zip(staged)
            .map(|((account, cell), balance)| {
                cell.balance = balance;
                cell.version += 1;
                BalanceRecord {
                    account: *account,
                    balance,
                    version: cell.version,
                }
            })
            .collect();

        drop(held);
        Ok(records)
    }

    /// Hand committed balances to the store
    ///
    /// Every record is attempted even after a failure; the first failure is
    /// reported. The in-memory commit is not rolled back.
    async fn persist(&self, records: &[BalanceRecord]) -> Result<(), FailureCause> {
        let mut first_failure = None;
        for record in records {
            if let Err(error) = self.store.persist(record).await {
                warn!(account = record.account, %error, "commit applied but not persisted");
                first_failure.get_or_insert(FailureCause::Persistence {
                    account: record.account,
                    message: error.to_string(),
                });
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for TransferCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferCoordinator")
            .field("accounts", &self.registry.len())
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::InMemoryStore;
    use crate::types::{InvalidRequest, Leg, StoreError};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn setup(balances: &[(AccountId, Decimal)]) -> (TransferCoordinator, Arc<InMemoryStore>) {
        let registry = Arc::new(AccountRegistry::new());
        for (id, balance) in balances {
            registry.create(*id, *balance).unwrap();
        }
        let store = Arc::new(InMemoryStore::from_balances(balances.iter().copied()));
        let coordinator = TransferCoordinator::new(registry, store.clone());
        (coordinator, store)
    }

    async fn balance(coordinator: &TransferCoordinator, id: AccountId) -> Decimal {
        coordinator.registry().get(id).unwrap().balance().await
    }

    struct FailingStore;

    #[async_trait]
    impl DurableStore for FailingStore {
        async fn load(&self) -> Result<HashMap<AccountId, Decimal>, StoreError> {
            Ok(HashMap::new())
        }

        async fn persist(&self, record: &BalanceRecord) -> Result<(), StoreError> {
            Err(StoreError::Rejected {
                account: record.account,
                message: "read-only".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_two_party_transfer_commits() {
        let (coordinator, _) = setup(&[(1, dec!(100)), (2, dec!(50))]);

        let outcome = coordinator
            .execute(&TransferRequest::between(1, 1, 2, dec!(30)))
            .await;

        assert_eq!(
            outcome,
            TransferOutcome::Committed(vec![
                BalanceRecord { account: 1, balance: dec!(70), version: 1 },
                BalanceRecord { account: 2, balance: dec!(80), version: 1 },
            ])
        );
        assert_eq!(balance(&coordinator, 1).await, dec!(70));
        assert_eq!(balance(&coordinator, 2).await, dec!(80));
    }

    #[tokio::test]
    async fn test_committed_balances_are_in_lock_order() {
        let (coordinator, _) = setup(&[(1, dec!(0)), (2, dec!(0)), (3, dec!(100))]);
        let request = TransferRequest::new(
            1,
            vec![Leg::new(3, dec!(-60)), Leg::new(2, dec!(40)), Leg::new(1, dec!(20))],
        );

        let outcome = coordinator.execute(&request).await;

        let TransferOutcome::Committed(records) = outcome else {
            panic!("expected commit, got {:?}", outcome);
        };
        let ids: Vec<_> = records.iter().map(|r| r.account).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(balance(&coordinator, 3).await, dec!(40));
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balances_untouched() {
        let (coordinator, _) = setup(&[(1, dec!(10)), (2, dec!(50))]);
        let request = TransferRequest::between(1, 1, 2, dec!(30));

        let outcome = coordinator.execute(&request).await;

        assert_eq!(
            outcome,
            TransferOutcome::Rejected(RejectReason::InsufficientFunds {
                account: 1,
                balance: dec!(10),
                requested: dec!(30),
            })
        );
        assert_eq!(balance(&coordinator, 1).await, dec!(10));
        assert_eq!(balance(&coordinator, 2).await, dec!(50));
        assert_eq!(coordinator.registry().get(2).unwrap().state().await.version, 0);

        // Re-running the rejected request yields the same reason.
        assert_eq!(coordinator.execute(&request).await, outcome);
    }

    #[tokio::test]
    async fn test_exact_balance_can_be_drained() {
        let (coordinator, _) = setup(&[(1, dec!(30)), (2, dec!(0))]);

        let outcome = coordinator
            .execute(&TransferRequest::between(1, 1, 2, dec!(30)))
            .await;

        assert!(outcome.is_committed());
        assert_eq!(balance(&coordinator, 1).await, dec!(0));
    }

    #[tokio::test]
    async fn test_unknown_account_is_rejected() {
        let (coordinator, _) = setup(&[(1, dec!(100))]);

        let outcome = coordinator
            .execute(&TransferRequest::between(1, 1, 99, dec!(5)))
            .await;

        assert_eq!(
            outcome,
            TransferOutcome::Rejected(RejectReason::UnknownAccount { account: 99 })
        );
        assert_eq!(balance(&coordinator, 1).await, dec!(100));
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_resolution() {
        let (coordinator, _) = setup(&[(1, dec!(100))]);
        let request = TransferRequest::new(1, vec![Leg::new(1, dec!(-5)), Leg::new(77, dec!(4))]);

        let outcome = coordinator.execute(&request).await;

        assert_eq!(
            outcome,
            TransferOutcome::Rejected(RejectReason::InvalidRequest(
                InvalidRequest::UnbalancedDeltas { sum: dec!(-1) }
            ))
        );
    }

    #[tokio::test]
    async fn test_overflow_after_locking_applies_nothing() {
        let (coordinator, _) = setup(&[(1, dec!(100)), (2, Decimal::MAX)]);

        let outcome = coordinator
            .execute(&TransferRequest::between(1, 1, 2, dec!(1)))
            .await;

        assert_eq!(outcome, TransferOutcome::Failed(FailureCause::Overflow { account: 2 }));
        assert_eq!(balance(&coordinator, 1).await, dec!(100));
        assert_eq!(coordinator.registry().get(1).unwrap().state().await.version, 0);
        assert!(coordinator.registry().get(1).unwrap().try_lock().is_some());
    }

    #[tokio::test]
    async fn test_deadline_releases_already_held_locks() {
        let (coordinator, _) = setup(&[(1, dec!(100)), (2, dec!(50))]);
        let contended = coordinator.registry().get(2).unwrap();
        let blocker = contended.lock().await;

        let deadline = Instant::now() + Duration::from_millis(50);
        let outcome = coordinator
            .execute_with_deadline(&TransferRequest::between(1, 1, 2, dec!(30)), deadline)
            .await;

        assert_eq!(outcome, TransferOutcome::Failed(FailureCause::Timeout { account: 2 }));
        assert!(coordinator.registry().get(1).unwrap().try_lock().is_some());
        drop(blocker);
        assert_eq!(balance(&coordinator, 1).await, dec!(100));
        assert_eq!(balance(&coordinator, 2).await, dec!(50));
    }

    #[tokio::test]
    async fn test_default_lock_timeout_applies_to_execute() {
        let (coordinator, _) = setup(&[(1, dec!(100)), (2, dec!(50))]);
        let coordinator = coordinator.with_lock_timeout(Some(Duration::from_millis(20)));
        let contended = coordinator.registry().get(1).unwrap();
        let _blocker = contended.lock().await;

        let outcome = coordinator
            .execute(&TransferRequest::between(1, 2, 1, dec!(5)))
            .await;

        assert_eq!(outcome, TransferOutcome::Failed(FailureCause::Timeout { account: 1 }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disjoint_transfer_proceeds_while_another_account_is_held() {
        let (coordinator, _) =
            setup(&[(1, dec!(100)), (2, dec!(50)), (3, dec!(100)), (4, dec!(0))]);
        let held = coordinator.registry().get(1).unwrap();
        let guard = held.lock().await;

        // Account 1 stays locked for the rest of the test body
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            coordinator.execute(&TransferRequest::between(1, 3, 4, dec!(25))),
        )
        .await
        .expect("transfer on unrelated accounts waited on account 1");
        assert!(outcome.is_committed());

        let deadline = Instant::now() + Duration::from_millis(50);
        let outcome = coordinator
            .execute_with_deadline(&TransferRequest::between(2, 2, 1, dec!(10)), deadline)
            .await;
        assert_eq!(outcome, TransferOutcome::Failed(FailureCause::Timeout { account: 1 }));

        drop(guard);
        assert_eq!(balance(&coordinator, 3).await, dec!(75));
        assert_eq!(balance(&coordinator, 4).await, dec!(25));
        assert_eq!(balance(&coordinator, 1).await, dec!(100));
        assert_eq!(balance(&coordinator, 2).await, dec!(50));
    }

    #[tokio::test]
    async fn test_locks_are_released_after_commit() {
        let (coordinator, _) = setup(&[(1, dec!(100)), (2, dec!(50))]);

        coordinator
            .execute(&TransferRequest::between(1, 1, 2, dec!(30)))
            .await;

        for id in [1, 2] {
            assert!(coordinator.registry().get(id).unwrap().try_lock().is_some());
        }
    }

    #[tokio::test]
    async fn test_commit_is_persisted() {
        let (coordinator, store) = setup(&[(1, dec!(100)), (2, dec!(50))]);

        coordinator
            .execute(&TransferRequest::between(1, 1, 2, dec!(30)))
            .await;

        assert_eq!(store.get(1).map(|r| (r.balance, r.version)), Some((dec!(70), 1)));
        assert_eq!(store.get(2).map(|r| (r.balance, r.version)), Some((dec!(80), 1)));
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_in_memory_commit() {
        let registry = Arc::new(AccountRegistry::new());
        registry.create(1, dec!(100)).unwrap();
        registry.create(2, dec!(50)).unwrap();
        let coordinator = TransferCoordinator::new(Arc::clone(&registry), Arc::new(FailingStore));

        let outcome = coordinator
            .execute(&TransferRequest::between(1, 1, 2, dec!(30)))
            .await;

        assert_eq!(
            outcome,
            TransferOutcome::Failed(FailureCause::Persistence {
                account: 1,
                message: "store rejected write for account 1: read-only".to_string(),
            })
        );
        assert_eq!(registry.get(1).unwrap().balance().await, dec!(70));
        assert_eq!(registry.get(2).unwrap().balance().await, dec!(80));
    }
}
