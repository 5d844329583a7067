// Output ports for ingested records: local storage and remote delivery

use crate::error::{DeliveryError, StorageError};
use crate::record::TransactionRecord;

/// Receives a whole batch of records at once.
///
/// Returns how many records were newly stored; duplicates of records already
/// held are not an error.
pub trait TransactionSink {
    fn insert_batch(&mut self, records: &[TransactionRecord]) -> Result<usize, StorageError>;
}

/// Sends records one at a time to a remote system.
pub trait TransactionDelivery {
    fn send(&self, record: &TransactionRecord) -> Result<(), DeliveryError>;
}

/// In-memory sink, handy for previews and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<TransactionRecord>,
}

impl TransactionSink for MemorySink {
    fn insert_batch(&mut self, records: &[TransactionRecord]) -> Result<usize, StorageError> {
        self.records.extend_from_slice(records);
        Ok(records.len())
    }
}
