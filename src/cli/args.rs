use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::EngineConfig;

/// Apply multi-account transfers to a ledger of account balances
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Apply atomic multi-account transfers to a ledger", long_about = None)]
pub struct CliArgs {
    /// CSV file with opening balances (`account,balance`)
    #[arg(value_name = "ACCOUNTS", help = "Path to the accounts CSV file")]
    pub accounts_file: PathBuf,

    /// CSV file with transfer legs (`transfer,account,delta`)
    #[arg(value_name = "TRANSFERS", help = "Path to the transfers CSV file")]
    pub transfers_file: PathBuf,

    /// Execution strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Execution strategy: 'sync' for sequential or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    /// Number of transfers per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transfers submitted per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of transfers in flight (async mode only)
    #[arg(
        long = "concurrency",
        value_name = "COUNT",
        help = "Maximum number of transfers executing concurrently (default: CPU cores)"
    )]
    pub concurrency: Option<usize>,

    /// Lock acquisition deadline per transfer, in milliseconds
    #[arg(
        long = "lock-timeout-ms",
        value_name = "MS",
        help = "Fail a transfer that cannot acquire its locks within MS milliseconds"
    )]
    pub lock_timeout_ms: Option<u64>,

    /// Optional per-transfer outcome report
    #[arg(
        long = "report",
        value_name = "PATH",
        help = "Write a transfer,status,detail CSV report to PATH"
    )]
    pub report: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available execution strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Build an `EngineConfig` from the CLI arguments
    ///
    /// Missing values fall back to the defaults; zero values are replaced by
    /// `EngineConfig::new` with a warning.
    pub fn to_engine_config(&self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig::new(
            self.concurrency.unwrap_or(default.concurrency_limit),
            self.batch_size.unwrap_or(default.batch_size),
            self.lock_timeout_ms.map(Duration::from_millis),
        )
    }
}
