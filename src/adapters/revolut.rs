// Revolut account statement export (CSV)
//
//   Type,Product,Started Date,Completed Date,Description,Amount,Fee,Currency,State,Balance
//   CARD_PAYMENT,Current,2024-03-05 18:22:10,2024-03-06 09:01:44,Uber,-12.40,0.00,EUR,COMPLETED,310.15
//
// Amount excludes the fee, so the canonical amount is Amount - Fee.

use rust_decimal::Decimal;
use std::path::Path;

use crate::coerce::{to_date, to_decimal, to_text, NumberStyle};
use crate::error::{FileReadError, ValidationError};
use crate::record::TransactionRecord;
use crate::table::{Container, RawTable, TableLayout};
use crate::validation::{validate_table, ColumnRules};

use super::{record_for, FormatAdapter};

const TYPE: &str = "Type";
const STARTED: &str = "Started Date";
const COMPLETED: &str = "Completed Date";
const DESCRIPTION: &str = "Description";
const AMOUNT: &str = "Amount";
const FEE: &str = "Fee";
const CURRENCY: &str = "Currency";
const BALANCE: &str = "Balance";

const LAYOUT: TableLayout = TableLayout {
    containers: &[Container::Delimited],
    header_row: 0,
    footer_rows: 0,
    delimiter: b',',
};

const RULES: ColumnRules = ColumnRules {
    required: &[TYPE, STARTED, COMPLETED, DESCRIPTION, AMOUNT, FEE, CURRENCY, BALANCE],
    critical: &[&[STARTED], &[DESCRIPTION], &[AMOUNT]],
};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d"];

pub struct RevolutAdapter;

impl RevolutAdapter {
    pub fn new() -> Self {
        RevolutAdapter
    }
}

impl Default for RevolutAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatAdapter for RevolutAdapter {
    fn entity_code(&self) -> &'static str {
        "revolut"
    }

    fn read(&self, file_path: &Path) -> Result<RawTable, FileReadError> {
        RawTable::load(file_path, &LAYOUT)
    }

    fn validate(&self, table: &RawTable) -> Result<(), ValidationError> {
        validate_table(table, &RULES)
    }

    fn transform(&self, table: &RawTable) -> Vec<TransactionRecord> {
        let started = table.column_index(STARTED);
        let completed = table.column_index(COMPLETED);
        let description = table.column_index(DESCRIPTION);
        let amount = table.column_index(AMOUNT);
        let fee = table.column_index(FEE);
        let balance = table.column_index(BALANCE);

        (0..table.rows.len())
            .map(|row| {
                let fee = to_decimal(table.cell(row, fee), NumberStyle::DecimalPoint)
                    .unwrap_or(Decimal::ZERO);
                let amount = to_decimal(table.cell(row, amount), NumberStyle::DecimalPoint)
                    .map(|a| a - fee);

                TransactionRecord {
                    date: to_date(table.cell(row, started), DATE_FORMATS),
                    value_date: to_date(table.cell(row, completed), DATE_FORMATS),
                    description: to_text(table.cell(row, description)),
                    amount,
                    balance: to_decimal(table.cell(row, balance), NumberStyle::DecimalPoint),
                    ..record_for(table, self.entity_code())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, FileMetadata};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn revolut_table(rows: Vec<Vec<&str>>) -> RawTable {
        RawTable::new(
            FileMetadata::from_file_name("Revolut_LT001234_20240331.csv").unwrap(),
            [TYPE, "Product", STARTED, COMPLETED, DESCRIPTION, AMOUNT, FEE, CURRENCY, "State", BALANCE]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(Cell::text).collect())
                .collect(),
        )
    }

    #[test]
    fn test_revolut_amount_includes_fee() {
        let table = revolut_table(vec![vec![
            "TRANSFER", "Current", "2024-03-05 18:22:10", "2024-03-06 09:01:44",
            "To John", "-100.00", "0.50", "EUR", "COMPLETED", "209.50",
        ]]);
        let adapter = RevolutAdapter::new();

        assert!(adapter.validate(&table).is_ok());
        let records = adapter.transform(&table);

        assert_eq!(records[0].amount, Some(Decimal::from_str("-100.50").unwrap()));
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(records[0].value_date, NaiveDate::from_ymd_opt(2024, 3, 6));
        assert_eq!(records[0].source, "Revolut");
        assert_eq!(records[0].entity_code, "revolut");
    }

    #[test]
    fn test_revolut_pending_row_has_no_value_date() {
        let table = revolut_table(vec![vec![
            "CARD_PAYMENT", "Current", "2024-03-30 10:00:00", "",
            "Uber", "-12.40", "", "EUR", "PENDING", "",
        ]]);

        let records = RevolutAdapter::new().transform(&table);

        assert_eq!(records[0].value_date, None);
        assert_eq!(records[0].balance, None);
        assert_eq!(records[0].amount, Some(Decimal::from_str("-12.40").unwrap()));
    }

    #[test]
    fn test_revolut_missing_fee_column_reported() {
        let mut table = revolut_table(vec![vec![
            "TOPUP", "Current", "2024-03-01 08:00:00", "2024-03-01 08:00:01",
            "Top-up", "50.00", "0.00", "EUR", "COMPLETED", "50.00",
        ]]);
        table.columns[6] = "Fees".to_string();

        let err = RevolutAdapter::new().validate(&table).unwrap_err();

        assert_eq!(err.to_string(), "Missing column: Fee");
    }
}
