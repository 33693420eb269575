use crate::core::{DeletionPolicy, LedgerConfig};
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Replay an expense journal and print who owes whom
#[derive(Parser, Debug)]
#[command(name = "split-ledger")]
#[command(about = "Replay an expense journal and print outstanding group balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing journal records
    #[arg(value_name = "JOURNAL", help = "Path to the journal CSV file")]
    pub input_file: PathBuf,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for sequential or 'async' for group-parallel batches"
    )]
    pub strategy: StrategyType,

    /// Number of journal records per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of journal records per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads replaying groups (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Balances below this amount count as settled
    #[arg(long = "epsilon", value_name = "AMOUNT", help = "Settlement threshold (default: 0.10)")]
    pub epsilon: Option<Decimal>,

    /// Allowed gap between an expense total and its splits
    #[arg(
        long = "split-tolerance",
        value_name = "AMOUNT",
        help = "Maximum difference between an expense and the sum of its splits (default: 0.01)"
    )]
    pub split_tolerance: Option<Decimal>,
}

/// Available replay strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values take their defaults; invalid ones fall back with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create a LedgerConfig from CLI arguments
    ///
    /// Journal replay never deletes expenses, so the deletion policy stays at
    /// its default.
    pub fn to_ledger_config(&self) -> LedgerConfig {
        let default = LedgerConfig::default();
        LedgerConfig::new(
            self.epsilon.unwrap_or(default.epsilon),
            self.split_tolerance.unwrap_or(default.split_tolerance),
            DeletionPolicy::default(),
        )
    }
}
