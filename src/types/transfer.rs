//! Transfer request types
//!
//! A [`TransferRequest`] is an ordered list of `(account, delta)` legs whose
//! deltas sum to zero. The two-party case is built with
//! [`TransferRequest::between`]. Requests are constructed unchecked so that
//! malformed input still reaches the coordinator and comes back as a typed
//! rejection instead of being lost at construction time.

use std::collections::HashSet;

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountId;

/// Transfer identifier, used only for reporting
pub type TransferId = u64;

/// One `(account, delta)` pair of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub account: AccountId,
    pub delta: Decimal,
}

impl Leg {
    pub fn new(account: AccountId, delta: Decimal) -> Self {
        Self { account, delta }
    }
}

/// Why a request's shape is invalid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    /// Fewer than two legs
    #[error("a transfer needs at least two legs, got {legs}")]
    TooFewLegs { legs: usize },

    /// The same account appears in more than one leg
    #[error("account {account} appears more than once")]
    DuplicateAccount { account: AccountId },

    /// Deltas do not sum to zero
    #[error("deltas sum to {sum}, expected 0")]
    UnbalancedDeltas { sum: Decimal },

    /// A leg moves no value
    #[error("leg for account {account} has a zero delta")]
    ZeroDelta { account: AccountId },

    /// Two-party amount was zero or negative
    #[error("transfer amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },

    /// Summing the deltas overflowed the decimal range
    #[error("deltas overflow the decimal range")]
    DeltaOverflow,
}

/// A request to atomically move value between two or more accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    id: TransferId,
    legs: Vec<Leg>,
    // Two-party amount as given by the caller, kept so a non-positive amount
    // can be reported as such rather than as a sign-flipped leg.
    amount: Option<Decimal>,
}

impl TransferRequest {
    /// Create a multi-leg transfer
    pub fn new(id: TransferId, legs: Vec<Leg>) -> Self {
        Self {
            id,
            legs,
            amount: None,
        }
    }

    /// Create a two-party transfer moving `amount` from `from` to `to`
    pub fn between(id: TransferId, from: AccountId, to: AccountId, amount: Decimal) -> Self {
        Self {
            id,
            legs: vec![Leg::new(from, -amount), Leg::new(to, amount)],
            amount: Some(amount),
        }
    }

    pub fn id(&self) -> TransferId {
        self.id
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Account identifiers referenced by this request, in leg order
    pub fn accounts(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.legs.iter().map(|leg| leg.account)
    }

    /// Check the request's shape
    ///
    /// Pure and side-effect free: validating the same request twice always
    /// yields the same answer.
    pub fn validate(&self) -> Result<(), InvalidRequest> {
        if let Some(amount) = self.amount {
            if amount <= Decimal::ZERO {
                return Err(InvalidRequest::NonPositiveAmount { amount });
            }
        }

        if self.legs.len() < 2 {
            return Err(InvalidRequest::TooFewLegs {
                legs: self.legs.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.legs.len());
        for leg in &self.legs {
            if !seen.insert(leg.account) {
                return Err(InvalidRequest::DuplicateAccount {
                    account: leg.account,
                });
            }
            if leg.delta.is_zero() {
                return Err(InvalidRequest::ZeroDelta {
                    account: leg.account,
                });
            }
        }

        let sum = self
            .legs
            .iter()
            .try_fold(Decimal::ZERO, |acc, leg| acc.checked_add(leg.delta))
            .ok_or(InvalidRequest::DeltaOverflow)?;
        if !sum.is_zero() {
            return Err(InvalidRequest::UnbalancedDeltas { sum });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_between_builds_debit_and_credit_legs() {
        let request = TransferRequest::between(1, 10, 20, dec!(30));

        assert_eq!(
            request.legs(),
            &[Leg::new(10, dec!(-30)), Leg::new(20, dec!(30))]
        );
        assert!(request.validate().is_ok());
    }

    #[rstest]
    #[case::single_leg(
        TransferRequest::new(1, vec![Leg::new(1, dec!(0))]),
        InvalidRequest::TooFewLegs { legs: 1 }
    )]
    #[case::no_legs(TransferRequest::new(1, vec![]), InvalidRequest::TooFewLegs { legs: 0 })]
    #[case::duplicate_account(
        TransferRequest::new(1, vec![Leg::new(1, dec!(-5)), Leg::new(1, dec!(5))]),
        InvalidRequest::DuplicateAccount { account: 1 }
    )]
    #[case::self_transfer(
        TransferRequest::between(1, 4, 4, dec!(5)),
        InvalidRequest::DuplicateAccount { account: 4 }
    )]
    #[case::unbalanced(
        TransferRequest::new(1, vec![Leg::new(1, dec!(-5)), Leg::new(2, dec!(4))]),
        InvalidRequest::UnbalancedDeltas { sum: dec!(-1) }
    )]
    #[case::zero_delta(
        TransferRequest::new(1, vec![Leg::new(1, dec!(-5)), Leg::new(2, dec!(5)), Leg::new(3, dec!(0))]),
        InvalidRequest::ZeroDelta { account: 3 }
    )]
    #[case::zero_amount(
        TransferRequest::between(1, 1, 2, dec!(0)),
        InvalidRequest::NonPositiveAmount { amount: dec!(0) }
    )]
    #[case::negative_amount(
        TransferRequest::between(1, 1, 2, dec!(-3)),
        InvalidRequest::NonPositiveAmount { amount: dec!(-3) }
    )]
    #[case::overflow(
        TransferRequest::new(1, vec![Leg::new(1, Decimal::MAX), Leg::new(2, Decimal::MAX), Leg::new(3, dec!(-1))]),
        InvalidRequest::DeltaOverflow
    )]
    fn test_validate_rejects(#[case] request: TransferRequest, #[case] expected: InvalidRequest) {
        assert_eq!(request.validate(), Err(expected));
    }

    #[test]
    fn test_validate_accepts_multi_leg() {
        let request = TransferRequest::new(
            9,
            vec![
                Leg::new(1, dec!(-60)),
                Leg::new(2, dec!(40)),
                Leg::new(3, dec!(20)),
            ],
        );

        assert!(request.validate().is_ok());
        assert_eq!(request.accounts().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_validate_is_repeatable() {
        let request = TransferRequest::new(1, vec![Leg::new(1, dec!(-5)), Leg::new(2, dec!(4))]);

        assert_eq!(request.validate(), request.validate());
    }
}
