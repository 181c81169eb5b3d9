//! Source-file parsing and column mapping for the import pipeline
//! (§4.C9 "Parse" and "Map" phases). Every format parses into the same
//! intermediate shape — one `BTreeMap<String, String>` per raw record —
//! before [`map_row`] applies the profile's `column_mappings` and datatype
//! coercion.

use std::collections::BTreeMap;
use std::io::Cursor;

use quick_xml::events::Event;
use quick_xml::Reader;
use reef_types::{ColumnMapping, ColumnValue, Row};
use serde::Deserialize;
use serde_json::Value;

use crate::error::PipelineError;

/// One raw record, column name to its raw text representation.
pub type RawRecord = BTreeMap<String, String>;

pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RawRecord>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut raw = RawRecord::new();
        for (i, header) in headers.iter().enumerate() {
            raw.insert(header.to_string(), record.get(i).unwrap_or("").to_string());
        }
        records.push(raw);
    }
    Ok(records)
}

/// Accepts either a top-level JSON array of objects, or `{"records": [...]}`
/// wrapping one — `format_configuration` does not currently select between
/// them, so both shapes are tried.
pub fn parse_json(bytes: &[u8]) -> Result<Vec<RawRecord>, PipelineError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| PipelineError::Parse { line: 0, message: e.to_string() })?;
    let array = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("records") {
            Some(Value::Array(items)) => items,
            _ => return Err(PipelineError::Parse { line: 0, message: "expected a JSON array or {\"records\": [...]}".into() }),
        },
        _ => return Err(PipelineError::Parse { line: 0, message: "expected a JSON array of objects".into() }),
    };

    array
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, json_scalar_to_text(&v))).collect()),
            other => Err(PipelineError::Parse { line: 0, message: format!("expected an object, got {other}") }),
        })
        .collect()
}

fn json_scalar_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct XmlFormatConfig {
    #[serde(default = "default_row_element")]
    row_element: String,
}

fn default_row_element() -> String {
    "row".to_string()
}

/// A flat `<rowElement><col>value</col>...</rowElement>` reader, matching
/// what [`crate::output::render_xml`] emits. Nested elements are not
/// supported — XSLT-grade transforms are out of scope.
pub fn parse_xml(bytes: &[u8], format_configuration: &Value) -> Result<Vec<RawRecord>, PipelineError> {
    let config: XmlFormatConfig = serde_json::from_value(format_configuration.clone()).unwrap_or(XmlFormatConfig {
        row_element: default_row_element(),
    });

    let mut reader = Reader::from_reader(Cursor::new(bytes));
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<RawRecord> = None;
    let mut current_field: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == config.row_element {
                    current = Some(RawRecord::new());
                } else if current.is_some() {
                    current_field = Some(name);
                }
            }
            Ok(Event::Text(text)) => {
                if let (Some(record), Some(field)) = (current.as_mut(), current_field.as_ref()) {
                    let decoded = text.unescape().map_err(|e| PipelineError::Parse { line: 0, message: e.to_string() })?;
                    record.insert(field.clone(), decoded.into_owned());
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == config.row_element {
                    if let Some(record) = current.take() {
                        records.push(record);
                    }
                } else if current_field.as_deref() == Some(name.as_str()) {
                    current_field = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PipelineError::Parse { line: reader.buffer_position(), message: e.to_string() }),
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct FixedWidthField {
    name: String,
    width: usize,
}

#[derive(Debug, Deserialize)]
struct FixedWidthFormatConfig {
    fields: Vec<FixedWidthField>,
}

/// Splits each line into the configured column widths, in order, trimming
/// trailing whitespace from every cell.
pub fn parse_fixed_width(bytes: &[u8], format_configuration: &Value) -> Result<Vec<RawRecord>, PipelineError> {
    let config: FixedWidthFormatConfig = serde_json::from_value(format_configuration.clone())
        .map_err(|e| PipelineError::Configuration(format!("fixed-width format_configuration: {e}")))?;

    let text = String::from_utf8_lossy(bytes);
    let mut records = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let mut record = RawRecord::new();
        let mut offset = 0usize;
        let chars: Vec<char> = line.chars().collect();
        for field in &config.fields {
            let end = (offset + field.width).min(chars.len());
            let cell: String = chars[offset.min(chars.len())..end].iter().collect();
            record.insert(field.name.clone(), cell.trim_end().to_string());
            offset += field.width;
        }
        records.push(record);
    }
    Ok(records)
}

/// One row-mapping failure, charged against `FailurePolicy`'s abort
/// thresholds by the caller.
#[derive(Debug)]
pub struct MapError {
    pub column: String,
    pub message: String,
}

/// Apply `column_mappings` to one raw record: renames `source` to `target`,
/// coerces the text value to `datatype`, and substitutes `default` for a
/// missing/null source cell. Mappings with `skip_on_null` simply omit the
/// target column instead of erroring.
pub fn map_row(raw: &RawRecord, mappings: &[ColumnMapping]) -> Result<Row, MapError> {
    let mut row = Row::new();
    for mapping in mappings {
        let raw_value = raw.get(&mapping.source).map(|s| s.as_str());
        let text = match raw_value {
            Some(s) if !s.is_empty() => Some(s),
            _ => mapping.default.as_deref(),
        };

        let text = match text {
            Some(t) => t,
            None => {
                if mapping.skip_on_null {
                    continue;
                }
                return Err(MapError {
                    column: mapping.target.clone(),
                    message: format!("missing value for required column {}", mapping.source),
                });
            }
        };

        let value = coerce(text, &mapping.datatype).ok_or_else(|| MapError {
            column: mapping.target.clone(),
            message: format!("{text:?} is not a valid {}", mapping.datatype),
        })?;
        row.insert(mapping.target.clone(), value);
    }
    Ok(row)
}

fn coerce(text: &str, datatype: &str) -> Option<ColumnValue> {
    match datatype.to_ascii_lowercase().as_str() {
        "int" | "integer" | "bigint" => text.parse::<i64>().ok().map(ColumnValue::Int),
        "float" | "double" | "decimal" | "numeric" => text.parse::<f64>().ok().map(ColumnValue::Float),
        "bool" | "boolean" => text.parse::<bool>().ok().map(ColumnValue::Bool),
        "timestamp" | "datetime" => chrono::DateTime::parse_from_rfc3339(text)
            .map(|t| ColumnValue::Timestamp(t.with_timezone(&chrono::Utc)))
            .ok(),
        _ => Some(ColumnValue::Text(text.to_string())),
    }
}
