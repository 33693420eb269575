//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. It reads the journal in batches and replays each
//! batch with group-based partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── LedgerConfig (epsilon, split tolerance)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (group partitioning + tokio tasks)
//!     └── Arc<LedgerEngine> (shared, thread-safe)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another, so a group's records keep their
//!   journal order even when they span batches
//! - Within a batch, each group is replayed in its own task
//!
//! A record only depends on its own group's membership and balances, so the
//! relative order of different groups does not affect the result.

use crate::core::r#async::BatchProcessor;
use crate::core::{LedgerConfig, LedgerEngine};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_balances_csv;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for batch processing
///
/// Controls how journal records are batched and the number of worker threads
/// replaying each batch.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of journal records per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values are replaced by the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid max concurrent batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    ledger: LedgerConfig,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy
    ///
    /// # Arguments
    ///
    /// * `config` - Batch size and worker thread count
    /// * `ledger` - Thresholds for the engine the journal is replayed into
    pub fn new(config: BatchConfig, ledger: LedgerConfig) -> Self {
        Self { config, ledger }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the journal in batches on a multi-threaded runtime
    ///
    /// 1. Builds a tokio runtime with the configured worker count
    /// 2. Reads records in batches with `AsyncReader`
    /// 3. Replays each batch through the `BatchProcessor`, waiting for it to
    ///    finish before reading the next one
    /// 4. Writes the outstanding balances of every group
    ///
    /// # Errors
    ///
    /// Runtime creation, file open and output failures are fatal. Rejected
    /// records are logged by the processor and skipped.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let engine = Arc::new(LedgerEngine::with_config(self.ledger));
            let processor = BatchProcessor::new(Arc::clone(&engine));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads futures::io, tokio files need the compat layer
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut rejected = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                let results = processor.process_batch(batch).await;
                rejected += results.iter().filter(|r| r.result.is_err()).count();
            }

            let balances = engine.all_balances();
            info!(balances = balances.len(), rejected, "journal replayed");

            write_balances_csv(&balances, output)?;

            Ok(())
        })
    }
}
