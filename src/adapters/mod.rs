// 🏗️ Format Adapters
// One adapter per bank export layout, all behind the same read/validate/transform contract

use std::path::Path;

use crate::error::{FileReadError, ValidationError};
use crate::record::TransactionRecord;
use crate::table::RawTable;

pub mod bpi;
pub mod cgd;
pub mod revolut;

pub use bpi::BpiAdapter;
pub use cgd::CgdAdapter;
pub use revolut::RevolutAdapter;

// ============================================================================
// CORE TRAIT
// ============================================================================

/// FormatAdapter - the contract every bank implementation satisfies
///
/// Adding a bank = one new type implementing this trait + one registry entry.
/// Adapters hold no state; a fresh one is handed out per ingestion.
pub trait FormatAdapter: Send + Sync {
    /// Stable identifier stamped on every record this adapter produces
    fn entity_code(&self) -> &'static str;

    /// Load the file into a raw table, including file-name metadata
    ///
    /// # Returns
    /// * `Ok(RawTable)` - header + data rows, preamble/footer removed
    /// * `Err(FileReadError)` - missing file, bad container, bad file name
    fn read(&self, file_path: &Path) -> Result<RawTable, FileReadError>;

    /// Check the table's structure, reporting every violation at once
    fn validate(&self, table: &RawTable) -> Result<(), ValidationError>;

    /// Map rows to canonical records, preserving row order.
    ///
    /// Never fails: cells that cannot be coerced become `None` in the record.
    fn transform(&self, table: &RawTable) -> Vec<TransactionRecord>;
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Record skeleton carrying the file-level provenance every row shares.
pub(crate) fn record_for(table: &RawTable, entity_code: &str) -> TransactionRecord {
    TransactionRecord {
        date: None,
        value_date: None,
        description: String::new(),
        amount: None,
        balance: None,
        category: String::new(),
        source: table.metadata.bank_code.clone(),
        account_id: table.metadata.account_id.clone(),
        extraction_date: table.metadata.extraction_date,
        entity_code: entity_code.to_string(),
    }
}
