use base64::Engine;
use chrono::{DateTime, Utc};
use reef_types::{ColumnValue, Row};
use serde_json::Value;
use tera::{Context, Tera};

use crate::error::EmailError;

/// Values every rendered subject/body has access to (§4.C11 step 2/3).
pub struct RenderContext {
    pub profile_id: String,
    pub profile_name: String,
    pub now: DateTime<Utc>,
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
            ColumnValue::Bytes(b) => Value::String(base64::engine::general_purpose::STANDARD.encode(b)),
            ColumnValue::Timestamp(t) => Value::String(t.to_rfc3339()),
        };
        map.insert(key.clone(), json);
    }
    Value::Object(map)
}

fn system_context(ctx: &RenderContext) -> Context {
    let mut context = Context::new();
    context.insert("profile_id", &ctx.profile_id);
    context.insert("profile_name", &ctx.profile_name);
    context.insert("name", &ctx.profile_name);
    context.insert("date", &ctx.now.format("%Y-%m-%d").to_string());
    context.insert("time", &ctx.now.format("%H:%M:%S").to_string());
    context.insert("datetime", &ctx.now.to_rfc3339());
    context.insert("timestamp", &ctx.now.timestamp());
    context.insert("now", &ctx.now.to_rfc3339());
    context
}

/// Render the subject line (§4.C11 step 2) through the system context only.
pub fn render_subject(template: &str, ctx: &RenderContext) -> Result<String, EmailError> {
    Ok(Tera::one_off(template, &system_context(ctx), true)?)
}

/// Render the body (§4.C11 step 3) over the row batch plus system context.
pub fn render_body(template: &str, rows: &[Row], ctx: &RenderContext) -> Result<String, EmailError> {
    let mut context = system_context(ctx);
    let rows_json: Vec<Value> = rows.iter().map(row_to_json).collect();
    context.insert("rows", &rows_json);
    if let Some(first) = rows_json.first() {
        context.insert("row", first);
    }
    Ok(Tera::one_off(template, &context, true)?)
}

/// Default subject when none is configured or resolvable (§4.C11 step 2).
pub fn default_subject(profile_name: &str) -> String {
    format!("Reef Export from {profile_name}")
}

/// Split a rendered body into per-document chunks when it contains more
/// than one top-level `<!doctype html>` document (§4.C11 step 4).
pub fn split_html_documents(body: &str) -> Vec<String> {
    let marker = "<!doctype html>";
    let lower = body.to_lowercase();
    let mut offsets: Vec<usize> = lower.match_indices(marker).map(|(i, _)| i).collect();
    if offsets.len() <= 1 {
        return vec![body.to_string()];
    }
    offsets.push(body.len());
    offsets
        .windows(2)
        .map(|window| body[window[0]..window[1]].trim().to_string())
        .collect()
}
