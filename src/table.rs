// 📄 Raw Table - tabular content of a bank export before normalization
//
// Two containers are supported: spreadsheets (calamine) and delimited text (csv).
// Both end up as the same RawTable: header names + data rows of Cells, with the
// bank's preamble and footer rows already cut away.

use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveDate;
use std::fs::File;
use std::path::Path;

use crate::error::FileReadError;

// ============================================================================
// CELLS
// ============================================================================

/// Cell - one value as found in the source file.
///
/// Blank text is normalized to `Empty` so "null" and "blank" mean the same thing
/// to validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    /// Build a text cell, trimming whitespace; blank text becomes `Empty`
    pub fn text(value: &str) -> Cell {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    fn from_spreadsheet(data: &Data) -> Cell {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::text(s),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(_) | Data::DateTimeIso(_) => data
                .as_date()
                .map(Cell::Date)
                .unwrap_or_else(|| Cell::text(&data.to_string())),
            Data::DurationIso(s) => Cell::text(s),
        }
    }
}

// ============================================================================
// FILE METADATA
// ============================================================================

/// FileMetadata - provenance encoded in the export's file name.
///
/// Convention: `bankcode_accountid_YYYYMMDD.ext`, e.g. `BPI_2212233828_20241225.xlsx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub file_name: String,
    pub bank_code: String,
    pub account_id: String,
    /// `None` when the date part is not a valid YYYYMMDD date
    pub extraction_date: Option<NaiveDate>,
}

impl FileMetadata {
    pub fn from_path(path: &Path) -> Result<FileMetadata, FileReadError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FileReadError::FileName(path.display().to_string()))?;

        FileMetadata::from_file_name(file_name)
    }

    pub fn from_file_name(file_name: &str) -> Result<FileMetadata, FileReadError> {
        let parts: Vec<&str> = file_name.split('_').collect();
        if parts.len() < 3 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(FileReadError::FileName(file_name.to_string()));
        }

        // "20241225.xlsx" -> "20241225"
        let date_part = parts[2].split('.').next().unwrap_or("");
        let extraction_date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok();

        Ok(FileMetadata {
            file_name: file_name.to_string(),
            bank_code: parts[0].to_string(),
            account_id: parts[1].to_string(),
            extraction_date,
        })
    }
}

// ============================================================================
// LAYOUT & CONTAINERS
// ============================================================================

/// Container - how the bytes of a file are organized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Spreadsheet,
    Delimited,
}

impl Container {
    /// Detect the container from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Container> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Some(Container::Spreadsheet),
            "csv" | "txt" => Some(Container::Delimited),
            _ => None,
        }
    }
}

/// TableLayout - where the table sits inside a bank's export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Containers this bank exports
    pub containers: &'static [Container],
    /// 0-based row holding the column names (preamble rows above are skipped)
    pub header_row: usize,
    /// Trailing rows to drop (totals, disclaimers)
    pub footer_rows: usize,
    /// Field separator for delimited exports
    pub delimiter: u8,
}

// ============================================================================
// RAW TABLE
// ============================================================================

/// RawTable - output of an adapter's `read`
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub metadata: FileMetadata,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

static EMPTY: Cell = Cell::Empty;

impl RawTable {
    pub fn new(metadata: FileMetadata, columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        RawTable {
            metadata,
            columns,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` for a column index; absent columns and short rows read as Empty
    pub fn cell(&self, row: usize, column: Option<usize>) -> &Cell {
        column
            .and_then(|idx| self.rows.get(row).and_then(|r| r.get(idx)))
            .unwrap_or(&EMPTY)
    }

    /// Load a file according to a layout.
    ///
    /// File-name metadata is parsed first so a badly named file fails before any I/O
    /// on its contents.
    pub fn load(path: &Path, layout: &TableLayout) -> Result<RawTable, FileReadError> {
        let metadata = FileMetadata::from_path(path)?;

        let container = Container::from_path(path)
            .filter(|c| layout.containers.contains(c))
            .ok_or_else(|| FileReadError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_string(),
            })?;

        let grid = match container {
            Container::Spreadsheet => read_spreadsheet(path)?,
            Container::Delimited => read_delimited(path, layout)?,
        };

        split_grid(path, grid, layout, metadata)
    }
}

/// Read the first worksheet as a grid whose row 0 is the sheet's first row.
fn read_spreadsheet(path: &Path) -> Result<Vec<Vec<Cell>>, FileReadError> {
    let spreadsheet_err = |source| FileReadError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FileReadError::NoWorksheet {
            path: path.to_path_buf(),
        })?
        .map_err(spreadsheet_err)?;

    // calamine ranges begin at the first used cell; pad so header_row stays absolute
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); first_row];

    for row in range.rows() {
        grid.push(row.iter().map(Cell::from_spreadsheet).collect());
    }

    Ok(grid)
}

/// Read delimited text as a grid. Blank lines are skipped by the csv reader and do
/// not count towards `header_row`.
fn read_delimited(path: &Path, layout: &TableLayout) -> Result<Vec<Vec<Cell>>, FileReadError> {
    let file = File::open(path).map_err(|source| FileReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(layout.delimiter)
        .from_reader(file);

    let mut grid = Vec::new();
    for result in reader.byte_records() {
        let record = result.map_err(|source| FileReadError::Delimited {
            path: path.to_path_buf(),
            source,
        })?;

        grid.push(
            record
                .iter()
                .map(|field| Cell::text(&String::from_utf8_lossy(field)))
                .collect(),
        );
    }

    Ok(grid)
}

fn split_grid(
    path: &Path,
    mut grid: Vec<Vec<Cell>>,
    layout: &TableLayout,
    metadata: FileMetadata,
) -> Result<RawTable, FileReadError> {
    if grid.len() <= layout.header_row {
        return Err(FileReadError::MissingHeader {
            path: path.to_path_buf(),
            row: layout.header_row,
        });
    }

    let keep = grid.len().saturating_sub(layout.footer_rows);
    grid.truncate(keep.max(layout.header_row + 1));

    let mut body = grid.split_off(layout.header_row);
    let header = body.remove(0);

    let columns = header
        .into_iter()
        .map(|cell| match cell {
            Cell::Text(s) => s,
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.to_string(),
            Cell::Empty => String::new(),
        })
        .collect();

    // Rows with no value at all are padding, not movements
    let rows = body
        .into_iter()
        .filter(|row| row.iter().any(|c| !c.is_blank()))
        .collect();

    Ok(RawTable::new(metadata, columns, rows))
}
