// CGD (Caixa Geral de Depósitos) account statement export
//
// ';'-separated text with six preamble lines (account holder, IBAN, period...),
// header on row 6 and a closing balance line. Movements split the amount into
// separate debit and credit columns, both written without sign.
//
//   Data mov. ; Data valor ; Descrição ; Débito ; Crédito ; Saldo contabilístico ; ...

use rust_decimal::Decimal;
use std::path::Path;

use crate::coerce::{to_date, to_decimal, to_text, NumberStyle};
use crate::error::{FileReadError, ValidationError};
use crate::record::TransactionRecord;
use crate::table::{Container, RawTable, TableLayout};
use crate::validation::{validate_table, ColumnRules};

use super::{record_for, FormatAdapter};

const DATE_MOV: &str = "Data mov.";
const DATE_VALUE: &str = "Data valor";
const DESCRIPTION: &str = "Descrição";
const DEBIT: &str = "Débito";
const CREDIT: &str = "Crédito";
const BALANCE: &str = "Saldo contabilístico";

const LAYOUT: TableLayout = TableLayout {
    containers: &[Container::Delimited, Container::Spreadsheet],
    header_row: 6,
    footer_rows: 1,
    delimiter: b';',
};

const RULES: ColumnRules = ColumnRules {
    required: &[DATE_MOV, DATE_VALUE, DESCRIPTION, DEBIT, CREDIT, BALANCE],
    critical: &[&[DATE_MOV], &[DESCRIPTION], &[DEBIT, CREDIT]],
};

const DATE_FORMATS: &[&str] = &["%d-%m-%Y"];

pub struct CgdAdapter;

impl CgdAdapter {
    pub fn new() -> Self {
        CgdAdapter
    }
}

impl Default for CgdAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed amount from the two unsigned columns: credit - debit.
///
/// One side missing counts as zero; both missing (or unparseable) is missing.
fn signed_amount(debit: Option<Decimal>, credit: Option<Decimal>) -> Option<Decimal> {
    match (debit, credit) {
        (None, None) => None,
        (debit, credit) => {
            Some(credit.unwrap_or(Decimal::ZERO) - debit.unwrap_or(Decimal::ZERO).abs())
        }
    }
}

impl FormatAdapter for CgdAdapter {
    fn entity_code(&self) -> &'static str {
        "cgd"
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
        let debit = table.column_index(DEBIT);
        let credit = table.column_index(CREDIT);
        let balance = table.column_index(BALANCE);

        (0..table.rows.len())
            .map(|row| {
                let amount = signed_amount(
                    to_decimal(table.cell(row, debit), NumberStyle::DecimalComma),
                    to_decimal(table.cell(row, credit), NumberStyle::DecimalComma),
                );

                TransactionRecord {
                    date: to_date(table.cell(row, date_mov), DATE_FORMATS),
                    value_date: to_date(table.cell(row, date_value), DATE_FORMATS),
                    description: to_text(table.cell(row, description)),
                    amount,
                    balance: to_decimal(table.cell(row, balance), NumberStyle::DecimalComma),
                    ..record_for(table, self.entity_code())
                }
            })
            .collect()
    }
}
