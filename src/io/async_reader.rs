//! Asynchronous CSV reader with batch interface
//!
//! Reads journal records in batches for the concurrent replay strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of JournalRecords
//!                  ↓
//!           csv_format module
//!           (JournalCsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, JournalCsvRecord};
use crate::types::JournalRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous journal reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader over CSV data
    ///
    /// Uses the same trimming and flexible field rules as the sync reader.
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` journal records
    ///
    /// Rows that fail to parse are logged and skipped; they do not count
    /// towards the batch size.
    ///
    /// # Returns
    ///
    /// The converted records, or an empty vector at end of file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<JournalRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<JournalCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_csv_record(csv_record) {
                    Ok(record) => batch.push(record),
                    Err(e) => warn!(error = %e, "skipping journal row"),
                },
                Some(Err(e)) => warn!(error = %e, "CSV parse error"),
                None => break,
            }
        }

        batch
    }
}
