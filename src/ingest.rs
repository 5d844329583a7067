// 🔄 Ingestion orchestrator
//
// bank code + file → adapter → read → validate → transform → records
//
// Pure with respect to its inputs: no logging, no persistence. Callers decide
// what happens to the records.

use std::path::Path;

use crate::error::IngestError;
use crate::record::TransactionRecord;
use crate::registry::AdapterRegistry;

#[derive(Clone)]
pub struct Ingestor {
    registry: AdapterRegistry,
}

impl Ingestor {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Run one file through its bank's adapter.
    ///
    /// Stops at the first failing stage; validation failures carry every
    /// violation found. On success the records follow the file's row order.
    pub fn ingest(&self, bank: &str, file_path: &Path) -> Result<Vec<TransactionRecord>, IngestError> {
        let adapter = self.registry.get_handler(bank)?;
        let table = adapter.read(file_path)?;
        adapter.validate(&table)?;
        Ok(adapter.transform(&table))
    }
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(AdapterRegistry::with_default_banks())
    }
}
