//! Processing strategy module for journal replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! encompassing both CSV parsing and ledger processing. Different
//! implementations (synchronous, asynchronous batch) are selected at runtime
//! and produce identical output for the same journal.

use crate::cli::StrategyType;
use crate::core::LedgerConfig;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete journal replay pipelines
///
/// Each strategy reads journal records from a CSV file, replays them through
/// a `LedgerEngine`, and writes the outstanding balances to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay a journal file and write the resulting balances
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the journal CSV file
    /// * `output` - Writer receiving the balance CSV
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened
    /// - A fatal I/O error occurs during reading or writing
    /// - Output cannot be written
    ///
    /// Malformed rows and rejected records are logged and skipped; they never
    /// make this method fail.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Sync or Async
/// * `batch` - Batch configuration for the async strategy (ignored for sync)
/// * `ledger` - Ledger thresholds shared by both strategies
pub fn create_strategy(
    strategy_type: StrategyType,
    batch: Option<BatchConfig>,
    ledger: LedgerConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(ledger)),
        StrategyType::Async => {
            let batch = batch.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(batch, ledger))
        }
    }
}
