use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::attachment::Attachment;
use crate::config::{HttpProviderConfig, SecurityMode, SmtpAuth, SmtpConfig};
use crate::error::EmailError;

/// One assembled, ready-to-send email (§4.C11 steps 1-5).
pub struct OutgoingEmail {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub cc: Vec<Mailbox>,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<Attachment>,
}

fn build_message(email: &OutgoingEmail) -> Result<Message, EmailError> {
    let mut builder = Message::builder().from(email.from.clone()).subject(email.subject.clone());
    for to in &email.to {
        builder = builder.to(to.clone());
    }
    for cc in &email.cc {
        builder = builder.cc(cc.clone());
    }

    let body = SinglePart::html(email.html_body.clone());
    let message = if email.attachments.is_empty() {
        builder.singlepart(body)?
    } else {
        let mut multipart = MultiPart::mixed().singlepart(body);
        for attachment in &email.attachments {
            multipart = multipart.singlepart(lettre::message::Attachment::new(attachment.filename.clone()).body(
                attachment.bytes.clone(),
                attachment.content_type.parse().unwrap_or_else(|_| "application/octet-stream".parse().unwrap()),
            ));
        }
        builder.multipart(multipart)?
    };
    Ok(message)
}

/// Send via SMTP, authenticating only when the config carries credentials
/// (§4.C11 step 6: "authenticate only if the server advertises auth").
pub fn send_smtp(config: &SmtpConfig, email: &OutgoingEmail) -> Result<(), EmailError> {
    let message = build_message(email)?;

    let mut builder = match config.security_mode {
        SecurityMode::None => SmtpTransport::builder_dangerous(&config.smtp_server),
        SecurityMode::StartTls => SmtpTransport::starttls_relay(&config.smtp_server)?,
        SecurityMode::Auto => SmtpTransport::relay(&config.smtp_server)?,
    };
    builder = builder.port(config.port);

    if let Some(auth) = &config.auth {
        let credentials = match auth {
            SmtpAuth::Basic { username, password } => Credentials::new(username.clone(), password.clone()),
            SmtpAuth::OAuth2 { username, token } => Credentials::new(username.clone(), token.clone()),
        };
        builder = builder.credentials(credentials);
    }

    let transport = builder.build();
    transport.send(&message)?;
    Ok(())
}

/// Send via the Resend HTTP API.
pub fn send_resend(config: &HttpProviderConfig, email: &OutgoingEmail) -> Result<(), EmailError> {
    let payload = serde_json::json!({
        "from": mailbox_header(&email.from, &config.from_name),
        "to": email.to.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        "cc": email.cc.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        "subject": email.subject,
        "html": email.html_body,
    });
    let client = reqwest::blocking::Client::new();
    client
        .post("https://api.resend.com/emails")
        .bearer_auth(&config.api_key)
        .json(&payload)
        .send()?
        .error_for_status()?;
    Ok(())
}

/// Send via the SendGrid HTTP API.
pub fn send_sendgrid(config: &HttpProviderConfig, email: &OutgoingEmail) -> Result<(), EmailError> {
    let payload = serde_json::json!({
        "personalizations": [{
            "to": email.to.iter().map(|m| serde_json::json!({ "email": m.email.to_string() })).collect::<Vec<_>>(),
            "cc": email.cc.iter().map(|m| serde_json::json!({ "email": m.email.to_string() })).collect::<Vec<_>>(),
        }],
        "from": { "email": email.from.email.to_string(), "name": config.from_name },
        "subject": email.subject,
        "content": [{ "type": "text/html", "value": email.html_body }],
    });
    let client = reqwest::blocking::Client::new();
    client
        .post("https://api.sendgrid.com/v3/mail/send")
        .bearer_auth(&config.api_key)
        .json(&payload)
        .send()?
        .error_for_status()?;
    Ok(())
}

fn mailbox_header(mailbox: &Mailbox, display_name: &Option<String>) -> String {
    match display_name {
        Some(name) => format!("{name} <{}>", mailbox.email),
        None => mailbox.email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(address: &str) -> Mailbox {
        Mailbox::new(None, address.parse().unwrap())
    }

    fn email(attachments: Vec<Attachment>) -> OutgoingEmail {
        OutgoingEmail {
            from: mailbox("reef@example.com"),
            to: vec![mailbox("finance@example.com")],
            cc: vec![],
            subject: "Nightly export".to_string(),
            html_body: "<!doctype html><p>hi</p>".to_string(),
            attachments,
        }
    }

    #[test]
    fn builds_single_part_message_without_attachments() {
        let message = build_message(&email(Vec::new())).expect("build");
        assert!(!message.formatted().is_empty());
    }

    #[test]
    fn builds_multipart_message_with_attachments() {
        let attachment = Attachment {
            filename: "report.csv".to_string(),
            content_type: "text/csv".to_string(),
            bytes: b"a,b\n1,2".to_vec(),
        };
        let message = build_message(&email(vec![attachment])).expect("build");
        let raw = String::from_utf8_lossy(&message.formatted());
        assert!(raw.contains("report.csv"));
    }

    #[test]
    fn mailbox_header_includes_display_name_when_present() {
        let header = mailbox_header(&mailbox("finance@example.com"), &Some("Finance".to_string()));
        assert_eq!(header, "Finance <finance@example.com>");
    }

    #[test]
    fn mailbox_header_falls_back_to_bare_address() {
        let header = mailbox_header(&mailbox("finance@example.com"), &None);
        assert_eq!(header, "finance@example.com");
    }
}
