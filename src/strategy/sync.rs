//! Synchronous processing strategy
//!
//! This module provides a single-threaded implementation of the
//! ProcessingStrategy trait. It streams journal rows through a `SyncReader`
//! and replays each one through the engine in file order.
//!
//! # Memory Efficiency
//!
//! Rows are processed one at a time. Memory usage is
//! O(users + groups + expenses + balances), not O(journal rows).

use crate::core::{LedgerConfig, LedgerEngine};
use crate::io::csv_format::write_balances_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use split_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::default();
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("journal.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncProcessingStrategy {
    ledger: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(ledger: LedgerConfig) -> Self {
        Self { ledger }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay the journal sequentially
    ///
    /// 1. Streams records from the CSV file with `SyncReader`
    /// 2. Replays each record through a fresh `LedgerEngine`
    /// 3. Writes the outstanding balances of every group
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let engine = LedgerEngine::with_config(self.ledger);
        let reader = SyncReader::new(input_path)?;

        let mut rejected = 0usize;
        for result in reader {
            match result {
                Ok(record) => {
                    let kind = record.kind();
                    if let Err(e) = engine.process(record) {
                        rejected += 1;
                        warn!(kind, error_kind = ?e.kind(), error = %e, "journal record rejected");
                    }
                }
                Err(e) => {
                    rejected += 1;
                    warn!(error = %e, "skipping journal row");
                }
            }
        }

        let balances = engine.all_balances();
        info!(balances = balances.len(), rejected, "journal replayed");

        write_balances_csv(&balances, output)?;

        Ok(())
    }
}
