use std::fs;
use std::path::Path;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::core::{CompensationScheduleEntry, MixScheduleEntry};

pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON schedule must be an array of row objects")]
    NotAnArray,
    #[error("schedule row {0} is not an object")]
    RowNotObject(usize),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub fn parse_rows(file_name: &str, text: &str) -> Result<Option<Vec<Row>>, ScheduleError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let rows = if is_json(file_name) {
        parse_json_rows(text)?
    } else {
        parse_csv_rows(text)?
    };
    tracing::debug!(file_name, rows = rows.len(), "decoded schedule upload");
    Ok(Some(rows))
}

pub fn load_rows(path: &Path) -> Result<Option<Vec<Row>>, ScheduleError> {
    let text = fs::read_to_string(path).map_err(|source| ScheduleError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_rows(&path.to_string_lossy(), &text)
}

pub fn compensation_schedule(rows: &[Row]) -> Vec<CompensationScheduleEntry> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| CompensationScheduleEntry {
            salary: numeric_field(row, "salary", idx).unwrap_or(0.0),
            bonus: numeric_field(row, "bonus", idx).unwrap_or(0.0),
            deferred: numeric_field(row, "deferred", idx).unwrap_or(0.0),
        })
        .collect()
}

pub fn mix_schedule(rows: &[Row]) -> Vec<MixScheduleEntry> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| MixScheduleEntry {
            asset: text_field(row, "asset"),
            weight: numeric_field(row, "weight", idx),
        })
        .collect()
}

fn is_json(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn parse_json_rows(text: &str) -> Result<Vec<Row>, ScheduleError> {
    let Value::Array(items) = serde_json::from_str::<Value>(text)? else {
        return Err(ScheduleError::NotAnArray);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(row) => Ok(row),
            _ => Err(ScheduleError::RowNotObject(idx)),
        })
        .collect()
}

fn parse_csv_rows(text: &str) -> Result<Vec<Row>, ScheduleError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Row::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), cell_value(cell));
        }
        rows.push(row);
    }
    Ok(rows)
}

// Present but empty cells read as 0; columns missing from a short row stay absent.
fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::from(0.0);
    }
    cell.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(cell.to_string()))
}

fn numeric_field(row: &Row, field: &str, row_index: usize) -> Option<f64> {
    match row.get(field)? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                tracing::warn!(
                    row = row_index,
                    column = field,
                    value = %s,
                    "non-numeric schedule value ignored"
                );
                None
            }
        },
        other => {
            tracing::warn!(
                row = row_index,
                column = field,
                value = %other,
                "non-numeric schedule value ignored"
            );
            None
        }
    }
}

fn text_field(row: &Row, field: &str) -> String {
    match row.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
