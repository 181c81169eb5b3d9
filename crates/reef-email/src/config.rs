use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the SMTP session negotiates transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    None,
    #[default]
    Auto,
    StartTls,
}

/// How the SMTP session authenticates, when it authenticates at all — §4.C11
/// says to authenticate "only if the server advertises auth".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SmtpAuth {
    Basic { username: String, password: String },
    OAuth2 { username: String, token: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpConfig {
    pub smtp_server: String,
    pub port: u16,
    #[serde(default)]
    pub security_mode: SecurityMode,
    pub from_address: String,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub auth: Option<SmtpAuth>,
}

/// Non-SMTP HTTP email providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpProviderConfig {
    pub api_key: String,
    pub from_address: String,
    #[serde(default)]
    pub from_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpProviderKind {
    Resend,
    SendGrid,
}

/// Top-level destination configuration for §4.C11.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "provider")]
pub enum EmailProviderConfig {
    Smtp(SmtpConfig),
    Resend(HttpProviderConfig),
    SendGrid(HttpProviderConfig),
}

/// Deduplication rule for attachments assembled across a batch (§4.C11 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentDedup {
    #[default]
    ByFilename,
    ByHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentMode {
    Binary,
    DocumentTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentConfig {
    pub mode: AttachmentMode,
    #[serde(default)]
    pub content_column: Option<String>,
    #[serde(default)]
    pub filename_column: Option<String>,
    #[serde(default)]
    pub document_template: Option<String>,
    #[serde(default)]
    pub dedup: AttachmentDedup,
    #[serde(default = "default_max_attachments")]
    pub max_attachments_per_email: u32,
}

fn default_max_attachments() -> u32 {
    10
}

pub const TOTAL_SIZE_WARNING_BYTES: u64 = 25 * 1024 * 1024;

impl AttachmentConfig {
    pub fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
