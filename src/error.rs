// Typed failures of the ingestion pipeline

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// No adapter is registered for the requested bank identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No handler available for bank: {bank}")]
pub struct UnsupportedBankError {
    pub bank: String,
}

/// The file could not be turned into a raw table.
///
/// Distinct from [`ValidationError`]: a read failure means the container itself is
/// wrong (missing, unreadable, unexpected format), not its contents.
#[derive(Debug, Error)]
pub enum FileReadError {
    #[error("cannot open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read spreadsheet {}: {source}", .path.display())]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("cannot read delimited file {}: {source}", .path.display())]
    Delimited {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no worksheet", .path.display())]
    NoWorksheet { path: PathBuf },

    #[error("unsupported container format '{extension}' for {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("file name '{0}' does not follow the bankcode_accountid_YYYYMMDD convention")]
    FileName(String),

    #[error("{} has no header row at row {row}", .path.display())]
    MissingHeader { path: PathBuf, row: usize },
}

/// One structural problem found while validating a raw table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    EmptyTable,
    MissingColumn(String),
    /// Blank cells in a critical column (or column group), with the number of rows affected
    MissingCriticalValues { column: String, rows: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::EmptyTable => write!(f, "Empty file"),
            Violation::MissingColumn(column) => write!(f, "Missing column: {}", column),
            Violation::MissingCriticalValues { column, rows } => write!(
                f,
                "Missing values in critical column '{}' ({} rows)",
                column, rows
            ),
        }
    }
}

/// Every violation found in one validation pass, in check order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", joined.join(" | "))
    }
}

impl std::error::Error for ValidationError {}

/// Failure of a whole `ingest` run. No records are produced when this is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    UnsupportedBank(#[from] UnsupportedBankError),

    #[error(transparent)]
    FileRead(#[from] FileReadError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Raised by a persistence sink.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cannot encode metadata: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Raised by a remote-delivery sink for a single record.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery transport failed: {0}")]
    Transport(String),

    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Failure of an ingest-then-store run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_joins_all_violations() {
        let err = ValidationError {
            violations: vec![
                Violation::EmptyTable,
                Violation::MissingColumn("Data Valor".to_string()),
                Violation::MissingCriticalValues {
                    column: "Valor em EUR".to_string(),
                    rows: 2,
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "Empty file | Missing column: Data Valor | Missing values in critical column 'Valor em EUR' (2 rows)"
        );
    }

    #[test]
    fn test_ingest_error_wraps_unsupported_bank() {
        let err: IngestError = UnsupportedBankError {
            bank: "Millennium".to_string(),
        }
        .into();

        assert_eq!(err.to_string(), "No handler available for bank: Millennium");
        assert!(matches!(err, IngestError::UnsupportedBank(_)));
    }
}
