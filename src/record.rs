// 🧾 Canonical Transaction Record
// The one shape every bank adapter converges to

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// TransactionRecord - one posted movement, normalized across banks.
///
/// Records are built only by an adapter's `transform` step and never mutated
/// afterwards. `None` in `date`, `value_date`, `amount`, `balance` or
/// `extraction_date` is the "missing" sentinel for a cell that could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Calendar date of the movement
    pub date: Option<NaiveDate>,
    /// Date the value was posted/settled (may differ from `date`)
    pub value_date: Option<NaiveDate>,
    /// Free text, empty string when the source cell is blank
    pub description: String,
    /// Signed amount: negative = debit, positive = credit
    pub amount: Option<Decimal>,
    /// Balance snapshot after the movement (not every bank provides it)
    pub balance: Option<Decimal>,
    /// Filled later by classification, always empty at ingestion
    pub category: String,

    // Provenance (constant across one file)
    /// Bank code taken from the file name
    pub source: String,
    pub account_id: String,
    pub extraction_date: Option<NaiveDate>,
    /// Which adapter produced the record ("bpi", "cgd", ...)
    pub entity_code: String,
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {:<40} | {:>12} | {:>12} | {}/{}",
            display_date(self.date),
            display_date(self.value_date),
            self.description,
            display_decimal(self.amount),
            display_decimal(self.balance),
            self.entity_code,
            self.account_id,
        )
    }
}

fn display_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string())
}

fn display_decimal(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
