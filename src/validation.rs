// 📐 Structural validation of raw tables
//
// Checks run in a fixed order and every violation is collected before failing,
// so one error shows the complete picture of what is wrong with a file.

use crate::error::{ValidationError, Violation};
use crate::table::RawTable;

/// ColumnRules - what a bank's table must contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRules {
    /// Columns that must be present in the header
    pub required: &'static [&'static str],
    /// Groups of columns that must carry a value on every row.
    ///
    /// A group is satisfied by a non-blank value in any of its columns, so a
    /// one-column group is a plain critical column and `&["Débito", "Crédito"]`
    /// means "at least one side of the movement is filled".
    pub critical: &'static [&'static [&'static str]],
}

/// Validate a table against a bank's rules.
///
/// Order of checks:
/// 1. table has at least one data row
/// 2. every required column is present (each missing one reported by name)
/// 3. no blank values in critical columns (one violation per column group)
pub fn validate_table(table: &RawTable, rules: &ColumnRules) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if table.is_empty() {
        violations.push(Violation::EmptyTable);
    }

    for column in rules.required {
        if !table.has_column(column) {
            violations.push(Violation::MissingColumn(column.to_string()));
        }
    }

    for group in rules.critical {
        // An absent column is already reported above
        let indices: Vec<usize> = group
            .iter()
            .filter_map(|column| table.column_index(column))
            .collect();
        if indices.is_empty() {
            continue;
        }

        let blank_rows = (0..table.rows.len())
            .filter(|&row| indices.iter().all(|&idx| table.cell(row, Some(idx)).is_blank()))
            .count();

        if blank_rows > 0 {
            violations.push(Violation::MissingCriticalValues {
                column: group.join("/"),
                rows: blank_rows,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}
