//! Spreadsheet report parsing.

use crate::types::Row;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::{Number, Value};
use std::io::Cursor;
use tracing::warn;

/// Reads the first worksheet of an `.xlsx`, `.xls`, `.xlsb` or `.ods` file.
///
/// The first row holds the column names; a blank header cell becomes
/// `col<N>` with `N` the 1-based sheet column, counted from column `A` even
/// when the data starts further right. Each following row with at least one
/// non-empty cell becomes one [`Row`]; fully blank rows are skipped. A
/// workbook that cannot be read yields no rows.
pub fn parse_spreadsheet(bytes: &[u8]) -> Vec<Row> {
    match read_first_sheet(bytes) {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, size = bytes.len(), "Unreadable spreadsheet report");
            Vec::new()
        }
    }
}

fn read_first_sheet(bytes: &[u8]) -> Result<Vec<Row>, calamine::Error> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };

    // used range may start right of column A
    let first_col = range.start().map_or(0, |(_, col)| col as usize);
    let mut lines = range.rows();
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };

    let headers: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| header_name(first_col + idx, cell))
        .collect();

    let rows = lines
        .filter(|line| line.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|line| {
            line.iter()
                .enumerate()
                .map(|(idx, cell)| {
                    let key = headers
                        .get(idx)
                        .cloned()
                        .unwrap_or_else(|| format!("col{}", first_col + idx + 1));
                    (key, cell_to_json(cell))
                })
                .collect::<Row>()
        })
        .collect();

    Ok(rows)
}

fn header_name(idx: usize, cell: &Data) -> String {
    let name = match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => match cell_to_json(other) {
            Value::String(s) => s,
            Value::Null => String::new(),
            value => value.to_string(),
        },
    };
    if name.is_empty() {
        format!("col{}", idx + 1)
    } else {
        name
    }
}

fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.trim().to_string()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => float_to_json(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(at) => Value::String(at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => float_to_json(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

// Whole numbers stored as floats come back as integers.
fn float_to_json(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}
