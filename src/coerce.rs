// Per-cell coercion into canonical field types.
//
// Nothing here fails: a cell that cannot be coerced yields None (the "missing"
// sentinel) so a single bad cell never aborts a file.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::table::Cell;

/// NumberStyle - how a bank writes numbers in text cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberStyle {
    /// `1,234.56`
    DecimalPoint,
    /// `1.234,56` (Portuguese banks)
    DecimalComma,
}

/// Coerce a cell to a date using the bank's formats, tried in order.
///
/// Formats may include a time part (`%Y-%m-%d %H:%M:%S`); only the date is kept.
/// Native spreadsheet dates pass through untouched.
pub fn to_date(cell: &Cell, formats: &[&str]) -> Option<NaiveDate> {
    match cell {
        Cell::Date(date) => Some(*date),
        Cell::Text(text) => formats.iter().find_map(|fmt| {
            NaiveDate::parse_from_str(text, fmt)
                .ok()
                .or_else(|| NaiveDateTime::parse_from_str(text, fmt).ok().map(|dt| dt.date()))
        }),
        Cell::Number(_) | Cell::Empty => None,
    }
}

/// Coerce a cell to a decimal amount.
pub fn to_decimal(cell: &Cell, style: NumberStyle) -> Option<Decimal> {
    match cell {
        Cell::Number(n) if n.is_finite() => Decimal::from_str(&n.to_string()).ok(),
        Cell::Text(text) => parse_decimal_text(text, style),
        _ => None,
    }
}

fn parse_decimal_text(text: &str, style: NumberStyle) -> Option<Decimal> {
    // Strip currency markers and thousands spacing ("1 234,56 €", "EUR 10.00")
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€' && *c != '\u{a0}')
        .collect();
    let compact = compact.trim_start_matches("EUR").trim_end_matches("EUR");

    let normalized = match style {
        NumberStyle::DecimalPoint => compact.replace(',', ""),
        NumberStyle::DecimalComma if compact.contains(',') || is_thousands_grouped(compact) => {
            compact.replace('.', "").replace(',', ".")
        }
        // No comma and not "1.234"-style grouping: a plain "1.5" keeps its point
        NumberStyle::DecimalComma => compact.to_string(),
    };

    if normalized.is_empty() {
        return None;
    }

    Decimal::from_str(&normalized).ok()
}

/// "1.234" / "-12.345.678": every '.' is followed by exactly three digits.
fn is_thousands_grouped(text: &str) -> bool {
    let mut groups = text.split('.');
    let head = groups.next().unwrap_or("");
    let rest: Vec<&str> = groups.collect();
    !rest.is_empty()
        && !head.trim_start_matches(['-', '+']).is_empty()
        && rest.iter().all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

/// Coerce a cell to free text; blank cells become the empty string.
pub fn to_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(text) => text.clone(),
        Cell::Number(n) => n.to_string(),
        Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
    }
}
