// Statement Ingest - Core Library
// Bank statement exports → canonical transaction records
// Exposes all modules for use in CLI, API server, and tests

pub mod adapters;
pub mod coerce;
pub mod config;
pub mod db;
#[cfg(feature = "delivery")]
pub mod delivery;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod record;
pub mod registry;
pub mod service;
pub mod sink;
pub mod table;
pub mod upload;
pub mod validation;

// Re-export commonly used types
pub use adapters::{BpiAdapter, CgdAdapter, FormatAdapter, RevolutAdapter};
pub use config::{Config, ConfigError};
pub use db::{
    AccountStat, Event, SqliteStore, StoredTransaction,
    get_account_stats, get_all_transactions, get_events_for_entity, get_transactions_by_account,
    idempotency_hash, insert_event, setup_database, verify_count,
};
#[cfg(feature = "delivery")]
pub use delivery::{DeliveryPayload, HttpDelivery};
pub use error::{
    DeliveryError, FileReadError, ImportError, IngestError, StorageError,
    UnsupportedBankError, ValidationError, Violation,
};
pub use ingest::Ingestor;
pub use logging::{init_tracing, LogFormat};
pub use record::TransactionRecord;
pub use registry::{AdapterConstructor, AdapterRegistry};
pub use service::{DeliverySummary, ImportService, ImportSummary};
pub use sink::{MemorySink, TransactionDelivery, TransactionSink};
pub use table::{Cell, Container, FileMetadata, RawTable, TableLayout};
pub use upload::{UploadPolicy, UploadRejection};
pub use validation::{validate_table, ColumnRules};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
