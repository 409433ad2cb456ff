//! Turns raw CSV or JSON text into a [`RawTable`].
//!
//! CSV goes through the `csv` crate in flexible mode, so quoted cells may
//! contain delimiters, doubled quotes and newlines, and rows may be ragged.
//! Blank lines are dropped, while a row of empty cells such as `,,,` is kept
//! and left for normalization to report. JSON must be an array of flat
//! objects.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::ImportError;
use crate::table::{Header, RawTable, SourceKind};

/// Candidate CSV delimiters. Comma wins any tie.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Parses `raw` as the given kind.
///
/// An empty JSON array is accepted and yields an empty table.
///
/// # Errors
///
/// Returns [`ImportError::Json`] for malformed JSON, [`ImportError::Csv`]
/// when the CSV reader fails, and
/// [`ImportError::Format`] when JSON is not an array of objects or CSV has
/// no data row beneath its header.
pub fn parse(raw: &str, kind: SourceKind) -> Result<RawTable, ImportError> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    match kind {
        SourceKind::Csv => parse_csv(text),
        SourceKind::Json => parse_json(text),
    }
}

/// Picks the delimiter that occurs most often in the first non-blank line.
///
/// Falls back to `,` when no candidate appears or when two or more share the
/// highest count.
#[must_use]
pub fn detect_delimiter(text: &str) -> u8 {
    let first_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");
    let counts: Vec<(u8, usize)> = DELIMITERS
        .iter()
        .map(|&d| (d, first_line.bytes().filter(|&b| b == d).count()))
        .collect();
    let max = counts.iter().map(|&(_, n)| n).max().unwrap_or(0);
    let leaders: Vec<u8> = counts
        .iter()
        .filter(|&&(_, n)| n == max)
        .map(|&(d, _)| d)
        .collect();

    match leaders.as_slice() {
        [only] if max > 0 => *only,
        _ => b',',
    }
}

fn parse_csv(text: &str) -> Result<RawTable, ImportError> {
    let delimiter = detect_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let blank_line = record.len() == 1 && record[0].trim().is_empty();
        let blank_header = records.is_empty() && record.iter().all(|c| c.trim().is_empty());
        if !blank_line && !blank_header {
            records.push(record);
        }
    }
    let mut records = records.into_iter();

    let Some(header_row) = records.next() else {
        return Err(ImportError::Format(
            "CSV input is empty; expected a header row and at least one data row".into(),
        ));
    };
    let headers: Vec<Header> = header_row.iter().map(Header::new).collect();

    let rows: Vec<Vec<String>> = records
        .map(|record| {
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            row
        })
        .collect();
    if rows.is_empty() {
        return Err(ImportError::Format(
            "CSV input has a header row but no data rows".into(),
        ));
    }

    tracing::debug!(
        delimiter = ?char::from(delimiter),
        columns = headers.len(),
        rows = rows.len(),
        "parsed CSV input"
    );
    Ok(RawTable { headers, rows })
}

fn parse_json(text: &str) -> Result<RawTable, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(ImportError::Format(
            "JSON input must be an array of objects".into(),
        ));
    };

    if items.is_empty() {
        tracing::warn!("JSON input is an empty array; importing zero records");
        return Ok(RawTable::default());
    }

    let mut keys: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut objects: Vec<Map<String, Value>> = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let Value::Object(object) = item else {
            return Err(ImportError::Format(format!(
                "JSON array element {idx} is not an object"
            )));
        };
        for key in object.keys() {
            if seen.insert(key.clone()) {
                keys.push(key.clone());
            }
        }
        objects.push(object);
    }

    let rows = objects
        .iter()
        .map(|object| {
            keys.iter()
                .map(|key| object.get(key).map(json_cell).unwrap_or_default())
                .collect()
        })
        .collect();
    let headers = keys.iter().map(|k| Header::new(k)).collect();

    Ok(RawTable { headers, rows })
}

/// Flattens a JSON value into cell text. Arrays join with `|` so that tag
/// lists split the same way a CSV cell would.
fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => value.to_string(),
        Value::Array(items) => items
            .iter()
            .map(json_cell)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("|"),
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
