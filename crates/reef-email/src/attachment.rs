use std::collections::HashSet;

use base64::Engine;
use md5::{Digest, Md5};
use reef_types::{ColumnValue, Row};

use crate::config::{AttachmentConfig, AttachmentDedup, AttachmentMode};
use crate::error::EmailError;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Curated extension → MIME map (§4.C11 step 5); anything else falls back
/// to `application/octet-stream`.
fn content_type_for(filename: &str) -> &'static str {
    let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match extension.as_str() {
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_control() || "/\\:*?\"<>|".contains(c) { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}

fn column_bytes(row: &Row, column: &str) -> Option<Vec<u8>> {
    match row.get(column)? {
        ColumnValue::Bytes(bytes) => Some(bytes.clone()),
        ColumnValue::Text(text) => Some(
            base64::engine::general_purpose::STANDARD
                .decode(text)
                .unwrap_or_else(|_| text.clone().into_bytes()),
        ),
        _ => None,
    }
}

fn column_string(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        ColumnValue::Text(s) => Some(s.clone()),
        ColumnValue::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

/// Build the attachment list for one email group, applying the configured
/// dedup rule and the `max_attachments_per_email` cap (§4.C11 step 5).
/// Returns the attachments plus whether the 25 MB total-size warning cap
/// was crossed.
pub fn build_attachments<F>(
    config: &AttachmentConfig,
    rows: &[Row],
    render_document: F,
) -> Result<(Vec<Attachment>, bool), EmailError>
where
    F: FnOnce(&[Row]) -> Result<Vec<u8>, EmailError>,
{
    let mut attachments = match config.mode {
        AttachmentMode::DocumentTemplate => {
            let bytes = render_document(rows)?;
            vec![Attachment {
                filename: "export.html".to_string(),
                content_type: "text/html".to_string(),
                bytes,
            }]
        }
        AttachmentMode::Binary => {
            let content_column = config
                .content_column
                .as_deref()
                .ok_or_else(|| EmailError::Attachment("binary attachment mode requires contentColumn".into()))?;
            let filename_column = config.filename_column.as_deref();

            rows.iter()
                .filter_map(|row| {
                    let bytes = column_bytes(row, content_column)?;
                    let filename = filename_column
                        .and_then(|column| column_string(row, column))
                        .unwrap_or_else(|| "attachment.bin".to_string());
                    let filename = sanitize_filename(&filename);
                    let content_type = content_type_for(&filename).to_string();
                    Some(Attachment {
                        filename,
                        content_type,
                        bytes,
                    })
                })
                .collect()
        }
    };

    dedup_attachments(&mut attachments, config.dedup);
    attachments.truncate(config.max_attachments_per_email as usize);

    let total_bytes: u64 = attachments.iter().map(|a| a.bytes.len() as u64).sum();
    let over_warning_cap = total_bytes > crate::config::TOTAL_SIZE_WARNING_BYTES;

    Ok((attachments, over_warning_cap))
}

fn dedup_attachments(attachments: &mut Vec<Attachment>, rule: AttachmentDedup) {
    let mut seen = HashSet::new();
    attachments.retain(|attachment| {
        let key = match rule {
            AttachmentDedup::ByFilename => attachment.filename.clone(),
            AttachmentDedup::ByHash => hex::encode(Md5::digest(&attachment.bytes)),
        };
        seen.insert(key)
    });
}
