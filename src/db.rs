use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::record::TransactionRecord;
use crate::sink::TransactionSink;

type Result<T> = std::result::Result<T, StorageError>;

/// A record as persisted, with its stable identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    /// Stable identity (UUID), assigned on first insert
    pub tx_uuid: String,
    /// Deduplication key, see `idempotency_hash`
    pub idempotency_hash: String,
    #[serde(flatten)]
    pub record: TransactionRecord,
}

/// Event for audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Per-account totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStat {
    pub account_id: String,
    pub source: String,
    pub entity_code: String,
    pub transaction_count: i64,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Compute idempotency hash for duplicate detection
///
/// Same account + same movement (dates, text, amount, running balance) + same
/// occurrence = same hash. `occurrence` numbers identical movements within one
/// batch (0, 1, ...), so two same-day purchases of the same amount are both kept
/// while re-importing the statement still matches every row.
pub fn idempotency_hash(record: &TransactionRecord, occurrence: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}", movement_key(record), occurrence));
    format!("{:x}", hasher.finalize())
}

fn movement_key(record: &TransactionRecord) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}",
        record.account_id,
        record.entity_code,
        opt_to_string(&record.date),
        opt_to_string(&record.value_date),
        record.description,
        opt_to_string(&record.amount),
        opt_to_string(&record.balance),
    )
}

fn opt_to_string<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Transactions Table
    // Dates are ISO-8601 text, decimals are exact text; NULL = missing value
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_uuid TEXT UNIQUE NOT NULL,
            idempotency_hash TEXT UNIQUE NOT NULL,
            date TEXT,
            value_date TEXT,
            description TEXT NOT NULL,
            amount TEXT,
            balance TEXT,
            category TEXT NOT NULL,
            source TEXT NOT NULL,
            account_id TEXT NOT NULL,
            extraction_date TEXT,
            entity_code TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_account ON transactions(account_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_date ON transactions(date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// SQLite-backed `TransactionSink`
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        debug!(path = %path.display(), "database ready");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl TransactionSink for SqliteStore {
    /// All-or-nothing: the batch runs in one SQLite transaction.
    /// Rows whose idempotency hash is already stored are skipped; any other
    /// failure rolls the whole batch back.
    fn insert_batch(&mut self, records: &[TransactionRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        let mut duplicates = 0;
        let mut occurrences: HashMap<String, usize> = HashMap::new();

        for record in records {
            let occurrence = occurrences.entry(movement_key(record)).or_insert(0);
            let hash = idempotency_hash(record, *occurrence);
            *occurrence += 1;

            // Only a stored hash is a duplicate; any other constraint failure aborts the batch
            let changed = tx.execute(
                "INSERT INTO transactions (
                    tx_uuid, idempotency_hash, date, value_date, description, amount,
                    balance, category, source, account_id, extraction_date, entity_code
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(idempotency_hash) DO NOTHING",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    hash,
                    record.date.map(|d| d.to_string()),
                    record.value_date.map(|d| d.to_string()),
                    record.description,
                    record.amount.map(|a| a.to_string()),
                    record.balance.map(|b| b.to_string()),
                    record.category,
                    record.source,
                    record.account_id,
                    record.extraction_date.map(|d| d.to_string()),
                    record.entity_code,
                ],
            )?;

            if changed == 0 {
                duplicates += 1;
            } else {
                inserted += 1;
            }
        }

        let first = &records[0];
        let event = Event::new(
            "import_completed",
            "account",
            &first.account_id,
            serde_json::json!({
                "source": first.source,
                "entity_code": first.entity_code,
                "received": records.len(),
                "inserted": inserted,
                "duplicates": duplicates,
            }),
            "importer",
        );
        insert_event(&tx, &event)?;
        tx.commit()?;

        info!(inserted, duplicates, account = %first.account_id, "batch stored");
        Ok(inserted)
    }
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| conversion_error(1, e))?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| conversion_error(5, e))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

const SELECT_TRANSACTIONS: &str = "SELECT tx_uuid, idempotency_hash, date, value_date, description,
        amount, balance, category, source, account_id, extraction_date, entity_code
     FROM transactions";

pub fn get_all_transactions(conn: &Connection) -> Result<Vec<StoredTransaction>> {
    let mut stmt = conn.prepare(&format!("{SELECT_TRANSACTIONS} ORDER BY id"))?;

    let transactions = stmt
        .query_map([], stored_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(transactions)
}

/// Get transactions of one account, in insertion (file row) order
pub fn get_transactions_by_account(
    conn: &Connection,
    account_id: &str,
) -> Result<Vec<StoredTransaction>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_TRANSACTIONS} WHERE account_id = ?1 ORDER BY id"
    ))?;

    let transactions = stmt
        .query_map(params![account_id], stored_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(transactions)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

    Ok(count)
}

/// Get statistics grouped by account
///
/// Totals are summed as exact decimals in Rust; SQLite would go through REAL.
pub fn get_account_stats(conn: &Connection) -> Result<Vec<AccountStat>> {
    let mut stats: BTreeMap<(String, String, String), AccountStat> = BTreeMap::new();

    for stored in get_all_transactions(conn)? {
        let r = stored.record;
        let stat = stats
            .entry((r.source.clone(), r.account_id.clone(), r.entity_code.clone()))
            .or_insert_with(|| AccountStat {
                account_id: r.account_id.clone(),
                source: r.source.clone(),
                entity_code: r.entity_code.clone(),
                transaction_count: 0,
                total_credits: Decimal::ZERO,
                total_debits: Decimal::ZERO,
                first_date: None,
                last_date: None,
            });

        stat.transaction_count += 1;
        match r.amount {
            Some(a) if a.is_sign_negative() => stat.total_debits += a.abs(),
            Some(a) => stat.total_credits += a,
            None => {}
        }
        if let Some(date) = r.date {
            stat.first_date = Some(stat.first_date.map_or(date, |d| d.min(date)));
            stat.last_date = Some(stat.last_date.map_or(date, |d| d.max(date)));
        }
    }

    Ok(stats.into_values().collect())
}

// ============================================================================
// ROW DECODING
// ============================================================================

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn get_date(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn get_decimal(row: &Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|s| Decimal::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn stored_from_row(row: &Row) -> rusqlite::Result<StoredTransaction> {
    Ok(StoredTransaction {
        tx_uuid: row.get(0)?,
        idempotency_hash: row.get(1)?,
        record: TransactionRecord {
            date: get_date(row, 2)?,
            value_date: get_date(row, 3)?,
            description: row.get(4)?,
            amount: get_decimal(row, 5)?,
            balance: get_decimal(row, 6)?,
            category: row.get(7)?,
            source: row.get(8)?,
            account_id: row.get(9)?,
            extraction_date: get_date(row, 10)?,
            entity_code: row.get(11)?,
        },
    })
}
