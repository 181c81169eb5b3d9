//! Email export subsystem (§4.C11): groups query-result rows into emails,
//! renders subject/body through a Scriban-like template engine, assembles
//! attachments, and delivers via SMTP or an HTTP provider.

mod attachment;
mod config;
mod delivery;
mod error;
mod grouping;
mod recipient;
mod template;

pub use attachment::{build_attachments, Attachment};
pub use config::{
    AttachmentConfig, AttachmentDedup, AttachmentMode, EmailProviderConfig, HttpProviderConfig, HttpProviderKind,
    SecurityMode, SmtpAuth, SmtpConfig,
};
pub use delivery::{send_resend, send_sendgrid, send_smtp, OutgoingEmail};
pub use error::EmailError;
pub use grouping::{group_rows, EmailGroup};
pub use recipient::{parse_mailbox, parse_mailbox_list};
pub use template::{default_subject, render_body, render_subject, split_html_documents, RenderContext};

use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use reef_types::{Row, SplitRecord, SplitStatus};

/// Everything §4.C11 needs to assemble and send one profile's email export.
pub struct EmailExportRequest<'a> {
    pub profile_id: String,
    pub profile_name: String,
    pub rows: Vec<Row>,
    pub split_key_column: Option<&'a str>,
    pub recipients_column: Option<&'a str>,
    pub recipients_hardcoded: Option<&'a str>,
    pub cc: Option<&'a str>,
    pub subject_hardcoded: Option<&'a str>,
    pub subject_column: Option<&'a str>,
    pub body_template: &'a str,
    pub attachment_config: Option<AttachmentConfig>,
    pub from: Mailbox,
    pub now: DateTime<Utc>,
}

/// One fully-rendered prospective email, returned both by `render_for_approval`
/// and (internally) right before sending.
pub struct RenderedEmail {
    pub split_key: Option<String>,
    pub recipients: Vec<Mailbox>,
    pub cc: Vec<Mailbox>,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<Attachment>,
    pub row_count: u64,
}

fn resolve_recipients(group: &grouping::EmailGroup, request: &EmailExportRequest) -> Result<Vec<Mailbox>, EmailError> {
    if let Some(hardcoded) = request.recipients_hardcoded {
        return parse_mailbox_list(hardcoded);
    }
    let column = request
        .recipients_column
        .ok_or_else(|| EmailError::MalformedAddress("no recipient source configured".into()))?;
    let mut mailboxes = Vec::new();
    for row in &group.rows {
        if let Some(reef_types::ColumnValue::Text(raw)) = row.get(column) {
            let mailbox = parse_mailbox(raw)?;
            if !mailboxes.iter().any(|m: &Mailbox| m.email == mailbox.email) {
                mailboxes.push(mailbox);
            }
        }
    }
    if mailboxes.is_empty() {
        return Err(EmailError::MalformedAddress(format!("no recipient resolved from column {column}")));
    }
    Ok(mailboxes)
}

fn resolve_subject(
    group: &grouping::EmailGroup,
    request: &EmailExportRequest,
    ctx: &RenderContext,
) -> Result<String, EmailError> {
    if let Some(hardcoded) = request.subject_hardcoded {
        return render_subject(hardcoded, ctx);
    }
    if let Some(column) = request.subject_column {
        if let Some(reef_types::ColumnValue::Text(subject)) = group.rows.first().and_then(|r| r.get(column)) {
            return Ok(subject.clone());
        }
    }
    Ok(default_subject(&request.profile_name))
}

fn render_one_group(group: &grouping::EmailGroup, request: &EmailExportRequest) -> Result<RenderedEmail, EmailError> {
    let ctx = RenderContext {
        profile_id: request.profile_id.clone(),
        profile_name: request.profile_name.clone(),
        now: request.now,
    };

    let recipients = resolve_recipients(group, request)?;
    let cc = request.cc.map(|raw| parse_mailbox_list(raw)).transpose()?.unwrap_or_default();
    let subject = resolve_subject(group, request, &ctx)?;
    let html_body = render_body(request.body_template, &group.rows, &ctx)?;

    let attachments = match &request.attachment_config {
        Some(config) => {
            let (built, _over_cap) = build_attachments(config, &group.rows, |rows| {
                config
                    .document_template
                    .as_deref()
                    .map(|template| render_body(template, rows, &ctx).map(String::into_bytes))
                    .unwrap_or_else(|| Ok(Vec::new()))
            })?;
            built
        }
        None => Vec::new(),
    };

    Ok(RenderedEmail {
        split_key: group.split_key.clone(),
        recipients,
        cc,
        subject,
        html_body,
        attachments,
        row_count: group.rows.len() as u64,
    })
}

/// Render every prospective email without sending (§4.C11 "rendering for
/// approval"). Each result is independent: one group's rendering failure
/// doesn't stop the others.
pub fn render_for_approval(request: &EmailExportRequest) -> Vec<Result<RenderedEmail, EmailError>> {
    let groups = group_rows(
        request.rows.clone(),
        request.split_key_column,
        request.recipients_column,
        request.recipients_hardcoded.is_some(),
    );
    groups.iter().map(|group| render_one_group(group, request)).collect()
}

fn send_via_provider(email: &RenderedEmail, from: &Mailbox, provider: &EmailProviderConfig) -> Result<(), EmailError> {
    let outgoing = OutgoingEmail {
        from: from.clone(),
        to: email.recipients.clone(),
        cc: email.cc.clone(),
        subject: email.subject.clone(),
        html_body: email.html_body.clone(),
        attachments: email.attachments.clone(),
    };
    match provider {
        EmailProviderConfig::Smtp(config) => send_smtp(config, &outgoing),
        EmailProviderConfig::Resend(config) => send_resend(config, &outgoing),
        EmailProviderConfig::SendGrid(config) => send_sendgrid(config, &outgoing),
    }
}

/// Render, optionally split multi-document HTML bodies, and send every
/// email for this export. Returns one [`SplitRecord`] per email attempted
/// (§4.C11 "split reporting") — the caller decides the overall execution
/// status from whether any entry is `Failed`.
pub fn send_export(request: &EmailExportRequest, provider: &EmailProviderConfig) -> Vec<SplitRecord> {
    let groups = group_rows(
        request.rows.clone(),
        request.split_key_column,
        request.recipients_column,
        request.recipients_hardcoded.is_some(),
    );

    let mut records = Vec::new();
    for group in &groups {
        let rendered = match render_one_group(group, request) {
            Ok(rendered) => rendered,
            Err(e) => {
                records.push(failed_record(group, 0, e.to_string()));
                continue;
            }
        };

        let is_document_template = request
            .attachment_config
            .as_ref()
            .map(|c| c.mode == AttachmentMode::DocumentTemplate)
            .unwrap_or(false);

        let documents = if is_document_template {
            vec![rendered.html_body.clone()]
        } else {
            split_html_documents(&rendered.html_body)
        };

        if documents.len() <= 1 {
            let result = send_via_provider(&rendered, &request.from, provider);
            records.push(result_to_record(group, rendered.row_count, result));
            continue;
        }

        for document in documents {
            let per_document = RenderedEmail {
                split_key: rendered.split_key.clone(),
                recipients: rendered.recipients.clone(),
                cc: rendered.cc.clone(),
                subject: rendered.subject.clone(),
                html_body: document,
                attachments: rendered.attachments.clone(),
                row_count: 1,
            };
            let result = send_via_provider(&per_document, &request.from, provider);
            records.push(result_to_record(group, per_document.row_count, result));
        }
    }
    records
}

fn failed_record(group: &grouping::EmailGroup, row_count: u64, error: String) -> SplitRecord {
    SplitRecord {
        split_key: group.split_key.clone().unwrap_or_else(|| "unknown".to_string()),
        status: SplitStatus::Failed,
        row_count,
        completed_at: Some(Utc::now()),
        error: Some(error),
        delivered_path: None,
    }
}

fn result_to_record(group: &grouping::EmailGroup, row_count: u64, result: Result<(), EmailError>) -> SplitRecord {
    match result {
        Ok(()) => SplitRecord {
            split_key: group.split_key.clone().unwrap_or_else(|| "unknown".to_string()),
            status: SplitStatus::Success,
            row_count,
            completed_at: Some(Utc::now()),
            error: None,
            delivered_path: None,
        },
        Err(e) => failed_record(group, row_count, e.to_string()),
    }
}
