// 📥 Import service: ingestion wired to a sink
//
// The core ingestion never logs; this layer does, since it is where a run
// begins and ends from the operator's point of view.

use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{DeliveryError, ImportError, IngestError, StorageError};
use crate::ingest::Ingestor;
use crate::record::TransactionRecord;
use crate::sink::{TransactionDelivery, TransactionSink};

/// Outcome of `import`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub bank: String,
    pub file_name: String,
    /// Records produced by the adapter
    pub received: usize,
    /// Records the sink stored (duplicates excluded)
    pub inserted: usize,
}

impl ImportSummary {
    pub fn duplicates(&self) -> usize {
        self.received.saturating_sub(self.inserted)
    }
}

/// Outcome of `deliver`
#[derive(Debug, Default)]
pub struct DeliverySummary {
    pub sent: usize,
    /// Record index (row order) and the reason it was not accepted
    pub failed: Vec<(usize, DeliveryError)>,
}

impl DeliverySummary {
    pub fn total(&self) -> usize {
        self.sent + self.failed.len()
    }
}

#[derive(Clone, Default)]
pub struct ImportService {
    ingestor: Ingestor,
}

impl ImportService {
    pub fn new(ingestor: Ingestor) -> Self {
        Self { ingestor }
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Ingest a file and hand the whole batch to `sink`.
    pub fn import<S: TransactionSink + ?Sized>(
        &self,
        bank: &str,
        file_path: &Path,
        sink: &mut S,
    ) -> Result<ImportSummary, ImportError> {
        let file_name = display_name(file_path);
        info!(bank, file = %file_name, "import started");

        let records = self.ingestor.ingest(bank, file_path).map_err(|e| {
            warn!(bank, file = %file_name, error = %e, "ingestion failed");
            e
        })?;

        Ok(self.store(bank, &file_name, &records, sink)?)
    }

    /// Hand an already ingested batch to `sink`.
    ///
    /// Lets callers that share one sink ingest outside their lock and hold it only
    /// for the write.
    pub fn store<S: TransactionSink + ?Sized>(
        &self,
        bank: &str,
        file_name: &str,
        records: &[TransactionRecord],
        sink: &mut S,
    ) -> Result<ImportSummary, StorageError> {
        let inserted = sink.insert_batch(records)?;

        let summary = ImportSummary {
            bank: bank.to_string(),
            file_name: file_name.to_string(),
            received: records.len(),
            inserted,
        };
        info!(
            bank,
            file = %summary.file_name,
            received = summary.received,
            inserted = summary.inserted,
            duplicates = summary.duplicates(),
            "import completed"
        );
        Ok(summary)
    }

    /// Ingest a file and send each record to `delivery`, in row order.
    ///
    /// A rejected record does not stop the run; it is reported in the summary.
    pub fn deliver<D: TransactionDelivery + ?Sized>(
        &self,
        bank: &str,
        file_path: &Path,
        delivery: &D,
    ) -> Result<DeliverySummary, IngestError> {
        let records = self.ingestor.ingest(bank, file_path)?;
        let mut summary = DeliverySummary::default();

        for (index, record) in records.iter().enumerate() {
            match delivery.send(record) {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    warn!(index, description = %record.description, error = %e, "record not delivered");
                    summary.failed.push((index, e));
                }
            }
        }

        info!(bank, sent = summary.sent, failed = summary.failed.len(), "delivery finished");
        Ok(summary)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
