//! CSV format handling for accounts, transfer legs and output
//!
//! This module centralizes all CSV format concerns, providing:
//! - Row structures for deserialization
//! - Conversion from rows to domain types
//! - Grouping of leg rows into transfer requests
//! - Balance and report serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{
    AccountId, BatchResult, LedgerError, Leg, TransferId, TransferOutcome, TransferRequest,
};

/// Accounts file row: `account,balance`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    pub account: AccountId,
    pub balance: String,
}

/// Transfers file row: `transfer,account,delta`
///
/// Each row is one leg; rows sharing a transfer id form one request.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LegCsvRecord {
    pub transfer: TransferId,
    pub account: AccountId,
    pub delta: String,
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok()
}

/// Convert an accounts row into an opening balance
pub fn convert_account_record(record: AccountCsvRecord) -> Result<(AccountId, Decimal), String> {
    let balance = parse_decimal(&record.balance).ok_or_else(|| {
        format!(
            "Invalid balance '{}' for account {}",
            record.balance, record.account
        )
    })?;
    Ok((record.account, balance))
}

/// Convert a transfers row into a leg of the given transfer
pub fn convert_leg_record(record: LegCsvRecord) -> Result<(TransferId, Leg), String> {
    let delta = parse_decimal(&record.delta).ok_or_else(|| {
        format!(
            "Invalid delta '{}' for account {} in transfer {}",
            record.delta, record.account, record.transfer
        )
    })?;
    Ok((record.transfer, Leg::new(record.account, delta)))
}

/// Group legs into requests, ordered by each transfer's first appearance
///
/// Legs of one transfer need not be adjacent. No shape validation happens
/// here; the coordinator rejects malformed transfers.
pub fn group_legs(legs: impl IntoIterator<Item = (TransferId, Leg)>) -> Vec<TransferRequest> {
    let mut order: Vec<(TransferId, Vec<Leg>)> = Vec::new();
    let mut position: HashMap<TransferId, usize> = HashMap::new();

    for (transfer, leg) in legs {
        let index = *position.entry(transfer).or_insert_with(|| {
            order.push((transfer, Vec::new()));
            order.len() - 1
        });
        order[index].1.push(leg);
    }

    order
        .into_iter()
        .map(|(transfer, legs)| TransferRequest::new(transfer, legs))
        .collect()
}

/// Write balances as CSV, sorted by account id
///
/// Columns: account, balance (4 decimal places)
pub fn write_balances_csv(
    balances: &BTreeMap<AccountId, Decimal>,
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "balance"])?;
    for (account, balance) in balances {
        writer.write_record(&[account.to_string(), format!("{:.4}", balance)])?;
    }
    writer.flush()?;

    Ok(())
}

/// Human-readable detail for one outcome
pub fn outcome_detail(outcome: &TransferOutcome) -> String {
    match outcome {
        TransferOutcome::Committed(records) => records
            .iter()
            .map(|record| format!("{}={:.4}", record.account, record.balance))
            .collect::<Vec<_>>()
            .join(" "),
        TransferOutcome::Rejected(reason) => reason.to_string(),
        TransferOutcome::Failed(cause) => cause.to_string(),
    }
}

/// Write one report row per transfer, sorted by transfer id
///
/// Columns: transfer, status, detail
pub fn write_report_csv(result: &BatchResult, output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    let mut entries: Vec<_> = result.entries().iter().collect();
    entries.sort_by_key(|entry| entry.request.id());

    writer.write_record(["transfer", "status", "detail"])?;
    for entry in entries {
        writer.write_record(&[
            entry.request.id().to_string(),
            entry.outcome.kind().as_str().to_string(),
            outcome_detail(&entry.outcome),
        ])?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResultAggregator;
    use crate::types::{BalanceRecord, RejectReason};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("100", dec!(100))]
    #[case(" 12.5 ", dec!(12.5))]
    #[case("0.0001", dec!(0.0001))]
    fn test_convert_account_record_valid(#[case] raw: &str, #[case] expected: Decimal) {
        let record = AccountCsvRecord {
            account: 3,
            balance: raw.to_string(),
        };

        assert_eq!(convert_account_record(record), Ok((3, expected)));
    }

    #[rstest]
    #[case::empty("")]
    #[case::text("lots")]
    fn test_convert_account_record_invalid(#[case] raw: &str) {
        let record = AccountCsvRecord {
            account: 3,
            balance: raw.to_string(),
        };

        let error = convert_account_record(record).unwrap_err();
        assert!(error.contains("Invalid balance"));
    }

    #[test]
    fn test_convert_leg_record() {
        let record = LegCsvRecord {
            transfer: 7,
            account: 2,
            delta: "-30.5".to_string(),
        };

        assert_eq!(convert_leg_record(record), Ok((7, Leg::new(2, dec!(-30.5)))));
    }

    #[test]
    fn test_convert_leg_record_invalid_delta() {
        let record = LegCsvRecord {
            transfer: 7,
            account: 2,
            delta: "abc".to_string(),
        };

        let error = convert_leg_record(record).unwrap_err();
        assert_eq!(error, "Invalid delta 'abc' for account 2 in transfer 7");
    }

    #[test]
    fn test_group_legs_by_first_appearance() {
        let legs = vec![
            (2, Leg::new(1, dec!(-5))),
            (1, Leg::new(3, dec!(-1))),
            (2, Leg::new(2, dec!(5))),
            (1, Leg::new(4, dec!(1))),
        ];

        let requests = group_legs(legs);

        assert_eq!(
            requests,
            vec![
                TransferRequest::new(2, vec![Leg::new(1, dec!(-5)), Leg::new(2, dec!(5))]),
                TransferRequest::new(1, vec![Leg::new(3, dec!(-1)), Leg::new(4, dec!(1))]),
            ]
        );
    }

    #[test]
    fn test_write_balances_csv() {
        let balances = BTreeMap::from([(2, dec!(80)), (1, dec!(70.5))]);
        let mut output = Vec::new();

        write_balances_csv(&balances, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,balance\n1,70.5000\n2,80.0000\n"
        );
    }

    #[test]
    fn test_write_report_csv_sorted_by_transfer() {
        let result = ResultAggregator::aggregate(vec![
            (
                TransferRequest::between(2, 1, 9, dec!(1)),
                TransferOutcome::Rejected(RejectReason::UnknownAccount { account: 9 }),
            ),
            (
                TransferRequest::between(1, 1, 2, dec!(30)),
                TransferOutcome::Committed(vec![
                    BalanceRecord { account: 1, balance: dec!(70), version: 1 },
                    BalanceRecord { account: 2, balance: dec!(80), version: 1 },
                ]),
            ),
        ]);
        let mut output = Vec::new();

        write_report_csv(&result, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "transfer,status,detail\n\
             1,committed,1=70.0000 2=80.0000\n\
             2,rejected,unknown account 9\n"
        );
    }
}
