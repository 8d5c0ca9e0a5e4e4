//! JSON-array bulk import plumbing shared by the spreadsheet import endpoints.

use serde_json::{Map, Value};

use shared_types::{AppError, ImportResults};

pub type Row = Map<String, Value>;

/// Accept a non-empty JSON array. Elements that are not objects become empty
/// rows so they fail the per-row required-field check.
pub fn rows(body: Value, noun: &str) -> Result<Vec<Row>, AppError> {
    let Value::Array(items) = body else {
        return Err(AppError::bad_request(format!(
            "Invalid data format. Expected an array of {noun}."
        )));
    };
    if items.is_empty() {
        return Err(AppError::bad_request("No data provided. The array is empty."));
    }
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => map,
            _ => Map::new(),
        })
        .collect())
}

/// Trimmed, non-blank text. Numbers are accepted too since spreadsheet
/// exports often turn codes and phone numbers into numbers.
pub fn text(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn missing_fields(row: &Row) -> String {
    format!(
        "Row missing required fields: {}",
        Value::Object(row.clone())
    )
}

pub fn summary(results: &ImportResults) -> String {
    format!(
        "Import completed. {} successful, {} failed.",
        results.success, results.failed
    )
}
