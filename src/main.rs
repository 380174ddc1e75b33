//! Ledger Transfer Engine CLI
//!
//! Command-line interface for applying transfers from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy sync accounts.csv transfers.csv > balances.csv
//! cargo run -- --concurrency 8 --batch-size 2000 accounts.csv transfers.csv > balances.csv
//! cargo run -- --lock-timeout-ms 500 --report report.csv -v accounts.csv transfers.csv
//! ```
//!
//! Final balances go to stdout; logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success (rejected or failed transfers do not change the exit code)
//! - 1: Error (missing arguments, file not found, duplicate accounts, etc.)

use std::fs::File;
use std::io::BufWriter;
use std::process;

use ledger_transfer_engine::types::LedgerError;
use ledger_transfer_engine::{cli, io, logging, strategy, BatchResult};
use tracing::info;

fn write_report(path: &std::path::Path, result: &BatchResult) -> Result<(), LedgerError> {
    let mut writer = BufWriter::new(File::create(path)?);
    io::write_report_csv(result, &mut writer)?;
    info!(path = %path.display(), "report written");
    Ok(())
}

fn main() {
    let args = cli::parse_args();
    logging::init_logging(args.verbose);

    let strategy = strategy::create_strategy(args.strategy.clone(), args.to_engine_config());

    let mut output = std::io::stdout();
    let result = match strategy.process(&args.accounts_file, &args.transfers_file, &mut output) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Some(path) = &args.report {
        if let Err(e) = write_report(path, &result) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
