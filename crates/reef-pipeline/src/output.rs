//! Native (on-DB-equivalent) rendering for the non-custom [`reef_types::OutputFormat`]
//! variants, plus the Scriban-like `Custom` template path (§4.C8 phase 5
//! "Transform").
//!
//! `Excel` has no dedicated spreadsheet writer in this workspace's
//! dependency stack; it is rendered as CSV bytes, matching the degraded
//! behavior a destination would see if the native `FOR XML`/`FOR JSON`
//! equivalent were unavailable. See `DESIGN.md` for the reasoning.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use reef_types::{ColumnValue, Row};
use serde_json::Value;
use tera::{Context, Tera};

use crate::error::PipelineError;

fn column_names(rows: &[Row]) -> Vec<String> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    for row in rows {
        names.extend(row.keys().cloned());
    }
    names.into_iter().collect()
}

fn cell_text(value: Option<&ColumnValue>) -> String {
    match value {
        None | Some(ColumnValue::Null) => String::new(),
        Some(ColumnValue::Bool(b)) => b.to_string(),
        Some(ColumnValue::Int(i)) => i.to_string(),
        Some(ColumnValue::Float(f)) => f.to_string(),
        Some(ColumnValue::Text(s)) => s.clone(),
        Some(ColumnValue::Bytes(b)) => {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD.encode(b)
        }
        Some(ColumnValue::Timestamp(t)) => t.to_rfc3339(),
    }
}

/// Render `rows` as CSV, column order stable across the whole export
/// (union of every row's keys, sorted).
pub fn render_csv(rows: &[Row]) -> Result<Vec<u8>, PipelineError> {
    let columns = column_names(rows);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in rows {
        let record: Vec<String> = columns.iter().map(|c| cell_text(row.get(c))).collect();
        writer.write_record(&record)?;
    }
    Ok(writer.into_inner().expect("in-memory csv writer never fails to flush"))
}

fn row_to_json(row: &Row) -> Value {
    let mut map = serde_json::Map::new();
    for (key, value) in row {
        let json = match value {
            ColumnValue::Null => Value::Null,
            ColumnValue::Bool(b) => Value::Bool(*b),
            ColumnValue::Int(i) => Value::Number((*i).into()),
            ColumnValue::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            ColumnValue::Text(s) => Value::String(s.clone()),
            ColumnValue::Bytes(_) => Value::String(cell_text(Some(value))),
            ColumnValue::Timestamp(t) => Value::String(t.to_rfc3339()),
        };
        map.insert(key.clone(), json);
    }
    Value::Object(map)
}

pub fn render_json(rows: &[Row]) -> Result<Vec<u8>, PipelineError> {
    let values: Vec<Value> = rows.iter().map(row_to_json).collect();
    serde_json::to_vec_pretty(&values).map_err(|e| PipelineError::Fatal(e.to_string()))
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A minimal `<rows><row><column>value</column></row></rows>` rendering,
/// standing in for `FOR XML AUTO` when the source connection can't do it
/// on-database (§4.C8 phase 5).
pub fn render_xml(rows: &[Row]) -> Vec<u8> {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rows>\n");
    for row in rows {
        out.push_str("  <row>\n");
        for (key, value) in row {
            let text = xml_escape(&cell_text(Some(value)));
            out.push_str(&format!("    <{key}>{text}</{key}>\n"));
        }
        out.push_str("  </row>\n");
    }
    out.push_str("</rows>\n");
    out.into_bytes()
}

/// Context values every Custom-format template has access to, mirroring
/// `reef-email`'s `RenderContext` (§4.C11) for a consistent templating
/// idiom across the workspace.
pub struct TransformContext {
    pub profile_name: String,
    pub now: DateTime<Utc>,
}

fn transform_context(rows: &[Row], ctx: &TransformContext) -> Context {
    let mut context = Context::new();
    context.insert("profile_name", &ctx.profile_name);
    context.insert("name", &ctx.profile_name);
    context.insert("date", &ctx.now.format("%Y-%m-%d").to_string());
    context.insert("time", &ctx.now.format("%H:%M:%S").to_string());
    context.insert("rows", &rows.iter().map(row_to_json).collect::<Vec<_>>());
    context
}

/// Render rows through a Scriban-like `Custom` template (XML/JSON/XSLT
/// authors all use the same `{{ }}` surface here; XSLT transforms proper
/// are a Non-goal).
pub fn render_custom(rows: &[Row], template: &str, ctx: &TransformContext) -> Result<Vec<u8>, PipelineError> {
    let rendered = Tera::one_off(template, &transform_context(rows, ctx), true)?;
    Ok(rendered.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(id: i64, name: &str) -> Row {
        let mut r = BTreeMap::new();
        r.insert("id".to_string(), ColumnValue::Int(id));
        r.insert("name".to_string(), ColumnValue::Text(name.to_string()));
        r
    }

    #[test]
    fn csv_header_is_union_of_all_row_keys_sorted() {
        let bytes = render_csv(&[row(1, "a"), row(2, "b")]).expect("render");
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "id,name");
        assert_eq!(lines.next().unwrap(), "1,a");
    }

    #[test]
    fn json_renders_an_array_of_objects() {
        let bytes = render_json(&[row(1, "a")]).expect("render");
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[0]["id"], 1);
        assert_eq!(value[0]["name"], "a");
    }

    #[test]
    fn xml_escapes_special_characters() {
        let bytes = render_xml(&[row(1, "<a> & \"b\"")]);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("&lt;a&gt; &amp; &quot;b&quot;"));
    }

    #[test]
    fn custom_template_sees_rows_and_system_context() {
        let ctx = TransformContext {
            profile_name: "nightly".into(),
            now: Utc::now(),
        };
        let bytes = render_custom(&[row(1, "a")], "{{ profile_name }}: {{ rows | length }}", &ctx).expect("render");
        assert_eq!(String::from_utf8(bytes).unwrap(), "nightly: 1");
    }
}
