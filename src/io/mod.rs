//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (row conversion, leg grouping, output serialization)
//! - `sync_reader` - Synchronous CSV reader with iterator interface, plus the input loaders

pub mod csv_format;
pub mod sync_reader;

pub use csv_format::{
    group_legs, outcome_detail, write_balances_csv, write_report_csv, AccountCsvRecord,
    LegCsvRecord,
};
pub use sync_reader::{read_accounts, read_transfers, SyncReader};
