//! Batch processing with group-based partitioning for concurrent journal replay
//!
//! This module provides the `BatchProcessor` struct, which replays a batch of
//! journal records concurrently while keeping each group's records in order.
//!
//! # Design
//!
//! Balances never cross group boundaries, so records of different groups are
//! independent. The processor partitions a batch by group and replays each
//! partition sequentially in its own tokio task. Records of one group keep
//! their journal order; records of different groups run in parallel.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── Arc<LedgerEngine>  (shared, all operations take &self)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::LedgerEngine;
use crate::types::{GroupId, JournalRecord, LedgerError};
use tracing::{error, warn};

/// Outcome of replaying one journal record
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The record that was replayed
    pub record: JournalRecord,

    /// Whether the engine accepted it
    pub result: Result<(), LedgerError>,
}

/// Replays journal batches, one task per group
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: Arc<LedgerEngine>,
}

impl BatchProcessor {
    /// Create a new BatchProcessor
    ///
    /// # Arguments
    ///
    /// * `engine` - The engine every task replays into
    pub fn new(engine: Arc<LedgerEngine>) -> Self {
        Self { engine }
    }

    /// Split a batch into per-group sub-batches
    ///
    /// # Guarantees
    ///
    /// - Each record appears in exactly one sub-batch
    /// - Records of a group keep their original order
    pub fn partition_by_group(
        &self,
        batch: Vec<JournalRecord>,
    ) -> HashMap<GroupId, Vec<JournalRecord>> {
        let mut group_batches: HashMap<GroupId, Vec<JournalRecord>> = HashMap::new();

        for record in batch {
            group_batches
                .entry(record.group().clone())
                .or_default()
                .push(record);
        }

        group_batches
    }

    /// Replay one group's records in order
    ///
    /// A rejected record is logged and does not stop the ones after it.
    pub async fn process_group_records(&self, records: Vec<JournalRecord>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let result = self.engine.process(record.clone());
            if let Err(e) = &result {
                warn!(
                    kind = record.kind(),
                    group = %record.group(),
                    error_kind = ?e.kind(),
                    error = %e,
                    "journal record rejected"
                );
            }
            results.push(ProcessingResult { record, result });
        }

        results
    }

    /// Replay a batch, running groups concurrently
    ///
    /// Results of one group are in journal order; results of different
    /// groups are in no particular order.
    pub async fn process_batch(&self, batch: Vec<JournalRecord>) -> Vec<ProcessingResult> {
        let group_batches = self.partition_by_group(batch);

        let mut tasks = Vec::with_capacity(group_batches.len());
        for (_group, records) in group_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_group_records(records).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(e) => error!(error = %e, "replay task failed"),
            }
        }

        results
    }
}
