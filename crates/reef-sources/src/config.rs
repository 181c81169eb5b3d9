use serde::{Deserialize, Serialize};

/// Source-side configuration shapes. Each flattens the matching
/// `reef_destinations` config (so the same JSON blob a destination would
/// use for delivery also works as a source) and adds an optional
/// `archivePath`/`archivePrefix` used by `archive` (§4.C7).

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSourceConfig {
    pub base_path: String,
    #[serde(default)]
    pub archive_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSourceConfig {
    pub url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SftpSourceConfig {
    pub host: String,
    #[serde(default = "default_sftp_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub private_key_path: Option<String>,
    #[serde(default)]
    pub private_key_passphrase: Option<String>,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub archive_path: Option<String>,
}

fn default_sftp_port() -> u16 {
    22
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3SourceConfig {
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub access_key: String,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub archive_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureBlobSourceConfig {
    pub connection_string: String,
    pub container: String,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub archive_prefix: Option<String>,
}
