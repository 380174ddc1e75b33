//! Canonical lock acquisition order
//!
//! Every caller that needs several account locks asks this policy for the
//! order to take them in. Since the order is a pure function of the ids, any
//! two overlapping requests see their common accounts in the same relative
//! order, which rules out circular wait.

use crate::types::AccountId;

/// Pure ordering policy over account identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct LockOrderingPolicy;

impl LockOrderingPolicy {
    /// Ascending, de-duplicated order of the given ids
    ///
    /// Ids are unique, so ascending id is already a strict total order.
    pub fn order(ids: &[AccountId]) -> Vec<AccountId> {
        let mut ordered = Self::order_by_key(ids.to_vec(), |id| *id);
        ordered.dedup();
        ordered
    }

    /// Order arbitrary items by a key that may not be unique
    ///
    /// Ties on `key` are broken by the item's position in the input, so the
    /// result is still a strict order as long as callers present tied items
    /// in a consistent sequence.
    pub fn order_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
    where
        K: Ord,
        F: Fn(&T) -> K,
    {
        let mut indexed: Vec<(usize, T)> = items.into_iter().enumerate().collect();
        indexed.sort_by(|(seq_a, a), (seq_b, b)| key(a).cmp(&key(b)).then(seq_a.cmp(seq_b)));
        indexed.into_iter().map(|(_, item)| item).collect()
    }
}
