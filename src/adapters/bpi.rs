// BPI (Banco Português de Investimento) account statement export
//
// Layout: 12 rows of account preamble, header on row 12, three footer rows with
// totals and a disclaimer. Exported as .xlsx; the ';'-separated text export keeps
// the same layout.
//
//   Data Mov. | Data Valor | Descrição do Movimento | Valor em EUR | Saldo em EUR
//   20-12-2024 | 20-12-2024 | COMPRA 4829 CONTINENTE | -45,99      | 1.204,01

use std::path::Path;

use crate::coerce::{to_date, to_decimal, to_text, NumberStyle};
use crate::error::{FileReadError, ValidationError};
use crate::record::TransactionRecord;
use crate::table::{Container, RawTable, TableLayout};
use crate::validation::{validate_table, ColumnRules};

use super::{record_for, FormatAdapter};

const DATE_MOV: &str = "Data Mov.";
const DATE_VALUE: &str = "Data Valor";
const DESCRIPTION: &str = "Descrição do Movimento";
const AMOUNT: &str = "Valor em EUR";
const BALANCE: &str = "Saldo em EUR";

const LAYOUT: TableLayout = TableLayout {
    containers: &[Container::Spreadsheet, Container::Delimited],
    header_row: 12,
    footer_rows: 3,
    delimiter: b';',
};

const RULES: ColumnRules = ColumnRules {
    required: &[DATE_MOV, DATE_VALUE, DESCRIPTION, AMOUNT, BALANCE],
    critical: &[&[DATE_MOV], &[DESCRIPTION], &[AMOUNT]],
};

// Statement format first; some exports carry ISO dates
const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%Y-%m-%d"];

pub struct BpiAdapter;

impl BpiAdapter {
    pub fn new() -> Self {
        BpiAdapter
    }
}

impl Default for BpiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatAdapter for BpiAdapter {
    fn entity_code(&self) -> &'static str {
        "bpi"
    }

    fn read(&self, file_path: &Path) -> Result<RawTable, FileReadError> {
        RawTable::load(file_path, &LAYOUT)
    }

    fn validate(&self, table: &RawTable) -> Result<(), ValidationError> {
        validate_table(table, &RULES)
    }

    fn transform(&self, table: &RawTable) -> Vec<TransactionRecord> {
        let date_mov = table.column_index(DATE_MOV);
        let date_value = table.column_index(DATE_VALUE);
        let description = table.column_index(DESCRIPTION);
        let amount = table.column_index(AMOUNT);
        let balance = table.column_index(BALANCE);

        (0..table.rows.len())
            .map(|row| TransactionRecord {
                date: to_date(table.cell(row, date_mov), DATE_FORMATS),
                value_date: to_date(table.cell(row, date_value), DATE_FORMATS),
                description: to_text(table.cell(row, description)),
                amount: to_decimal(table.cell(row, amount), NumberStyle::DecimalComma),
                balance: to_decimal(table.cell(row, balance), NumberStyle::DecimalComma),
                ..record_for(table, self.entity_code())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, FileMetadata};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn bpi_table(rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable::new(
            FileMetadata::from_file_name("BPI_2212233828_20241225.xlsx").unwrap(),
            [DATE_MOV, DATE_VALUE, DESCRIPTION, AMOUNT, BALANCE]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows,
        )
    }

    #[test]
    fn test_bpi_transform_single_row() {
        let table = bpi_table(vec![vec![
            Cell::text("2021-01-01"),
            Cell::text("2021-01-01"),
            Cell::text("Test"),
            Cell::Number(1.0),
            Cell::Number(2.0),
        ]]);
        let adapter = BpiAdapter::new();

        assert!(adapter.validate(&table).is_ok());
        let records = adapter.transform(&table);

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(r.value_date, NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(r.description, "Test");
        assert_eq!(r.amount, Some(Decimal::from(1)));
        assert_eq!(r.balance, Some(Decimal::from(2)));
        assert_eq!(r.category, "");
        assert_eq!(r.source, "BPI");
        assert_eq!(r.account_id, "2212233828");
        assert_eq!(r.extraction_date, NaiveDate::from_ymd_opt(2024, 12, 25));
        assert_eq!(r.entity_code, "bpi");
    }

    #[test]
    fn test_bpi_transform_statement_formats() {
        let table = bpi_table(vec![vec![
            Cell::text("20-12-2024"),
            Cell::text("21-12-2024"),
            Cell::text("COMPRA 4829 CONTINENTE"),
            Cell::text("-45,99"),
            Cell::text("1.204,01"),
        ]]);

        let records = BpiAdapter::new().transform(&table);

        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 12, 20));
        assert_eq!(records[0].value_date, NaiveDate::from_ymd_opt(2024, 12, 21));
        assert_eq!(records[0].amount, Some(Decimal::from_str("-45.99").unwrap()));
        assert_eq!(records[0].balance, Some(Decimal::from_str("1204.01").unwrap()));
    }

    #[test]
    fn test_bpi_bad_cells_become_missing() {
        let table = bpi_table(vec![vec![
            Cell::text("32-13-2024"),
            Cell::Empty,
            Cell::text("TRF"),
            Cell::text("abc"),
            Cell::Empty,
        ]]);

        let records = BpiAdapter::new().transform(&table);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, None);
        assert_eq!(records[0].value_date, None);
        assert_eq!(records[0].amount, None);
        assert_eq!(records[0].balance, None);
        assert_eq!(records[0].description, "TRF");
    }

    #[test]
    fn test_bpi_all_null_description_fails_validation() {
        let table = bpi_table(vec![
            vec![
                Cell::text("01-01-2024"),
                Cell::text("01-01-2024"),
                Cell::Empty,
                Cell::text("1"),
                Cell::text("2"),
            ],
            vec![
                Cell::text("02-01-2024"),
                Cell::text("02-01-2024"),
                Cell::Empty,
                Cell::text("1"),
                Cell::text("3"),
            ],
        ]);

        let err = BpiAdapter::new().validate(&table).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Missing values in critical column 'Descrição do Movimento' (2 rows)"
        );
    }
}
