//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over deserialized rows of a CSV file, plus
//! the two loaders the strategies use: opening balances and transfer
//! requests.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as `Err` items, with line numbers
//! - The loaders log bad rows with `warn!` and skip them

use std::collections::BTreeMap;
use std::fs::File;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::io::csv_format::{
    convert_account_record, convert_leg_record, group_legs, AccountCsvRecord, LegCsvRecord,
};
use crate::types::{AccountId, LedgerError, TransferRequest};

/// Streaming reader over rows of type `T`
#[derive(Debug)]
pub struct SyncReader<T> {
    reader: csv::Reader<File>,
    line_num: u64,
    _row: PhantomData<T>,
}

impl<T: DeserializeOwned> SyncReader<T> {
    /// Open a CSV file with a header row
    ///
    /// The reader trims whitespace from all fields and tolerates ragged rows;
    /// a ragged row surfaces as a row error rather than a fatal one.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LedgerError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LedgerError::IoError {
                message: format!("Failed to open file '{}': {}", path.display(), e),
            },
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
            _row: PhantomData,
        })
    }

    /// Line number of the most recently yielded row (the header is line 1)
    pub fn line(&self) -> u64 {
        self.line_num
    }
}

impl<T: DeserializeOwned> Iterator for SyncReader<T> {
    type Item = Result<T, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<T>();
        let row = deserializer.next()?;
        self.line_num += 1;
        Some(row.map_err(LedgerError::from))
    }
}

/// Load opening balances from an `account,balance` file
///
/// # Errors
///
/// * `LedgerError::FileNotFound` / `LedgerError::IoError` if the file cannot be opened
/// * `LedgerError::DuplicateAccount` if an account id appears twice
pub fn read_accounts(path: &Path) -> Result<BTreeMap<AccountId, Decimal>, LedgerError> {
    let mut reader = SyncReader::<AccountCsvRecord>::new(path)?;
    let mut balances = BTreeMap::new();

    while let Some(row) = reader.next() {
        let converted = row
            .map_err(|e| e.to_string())
            .and_then(convert_account_record);
        match converted {
            Ok((account, balance)) => {
                if balances.insert(account, balance).is_some() {
                    return Err(LedgerError::duplicate_account(account));
                }
            }
            Err(message) => warn!(line = reader.line(), "Skipping account row: {}", message),
        }
    }

    debug!(accounts = balances.len(), path = %path.display(), "accounts loaded");
    Ok(balances)
}

/// Load transfer requests from a `transfer,account,delta` file
///
/// # Errors
///
/// * `LedgerError::FileNotFound` / `LedgerError::IoError` if the file cannot be opened
pub fn read_transfers(path: &Path) -> Result<Vec<TransferRequest>, LedgerError> {
    let mut reader = SyncReader::<LegCsvRecord>::new(path)?;
    let mut legs = Vec::new();

    while let Some(row) = reader.next() {
        let converted = row
            .map_err(|e| e.to_string())
            .and_then(convert_leg_record);
        match converted {
            Ok(leg) => legs.push(leg),
            Err(message) => warn!(line = reader.line(), "Skipping transfer row: {}", message),
        }
    }

    let requests = group_legs(legs);
    debug!(transfers = requests.len(), path = %path.display(), "transfers loaded");
    Ok(requests)
}
