use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::DestinationId;

/// The delivery protocol a [`Destination`] speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    Local,
    Ftp,
    Sftp,
    S3,
    AzureBlob,
    Http,
    Email,
    NetworkShare,
    WebDav,
}

impl DestinationKind {
    /// Kinds that support best-effort [`compensate`](crate) (saga rollback).
    /// Matches §4.C6: HTTP, Email, NetworkShare, WebDav report "not
    /// supported" instead.
    pub fn supports_compensate(self) -> bool {
        matches!(
            self,
            DestinationKind::Local | DestinationKind::Ftp | DestinationKind::S3 | DestinationKind::AzureBlob
        )
    }

    /// The case-insensitive allow-list of secret leaf field names for this
    /// destination kind, used by `reef-encrypt`'s masking operations.
    pub fn secret_fields(self) -> &'static [&'static str] {
        match self {
            DestinationKind::Local => &[],
            DestinationKind::Ftp | DestinationKind::Sftp => {
                &["password", "privatekeypassphrase", "privatekeypath"]
            }
            DestinationKind::S3 => &["accesskey", "secretkey"],
            DestinationKind::AzureBlob => &["connectionstring"],
            DestinationKind::Http => &["authtoken", "oauthtoken", "apikey"],
            DestinationKind::Email => &[
                "smtppassword",
                "oauthtoken",
                "resendapikey",
                "sendgridapikey",
            ],
            DestinationKind::NetworkShare => &["password"],
            DestinationKind::WebDav => &["password"],
        }
    }
}

/// A delivery endpoint. `configuration` carries per-kind fields as
/// described in §6 of the spec; secret leaves are ciphertext at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub name: String,
    pub kind: DestinationKind,
    pub configuration: Value,
    pub active: bool,
    pub integrity_hash: String,
}

impl Destination {
    /// Fields that feed [`reef_hash`]'s business-field hash, in the order
    /// the hasher will canonicalise them (lexicographic by field name).
    /// `configuration` is serialised compactly so field order inside the
    /// JSON object doesn't affect the hash value (`serde_json` preserves
    /// insertion order, so two semantically-identical configs built in a
    /// different field order would otherwise hash differently).
    pub fn hashable_fields(&self) -> Vec<(&'static str, String)> {
        let mut config_keys: Vec<_> = match self.configuration.as_object() {
            Some(map) => map.iter().collect(),
            None => Vec::new(),
        };
        config_keys.sort_by(|a, b| a.0.cmp(b.0));
        let configuration = config_keys
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");

        vec![
            ("active", self.active.to_string()),
            ("configuration", configuration),
            ("kind", format!("{:?}", self.kind)),
            ("name", self.name.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_four_kinds_support_compensate() {
        let supporting: Vec<_> = [
            DestinationKind::Local,
            DestinationKind::Ftp,
            DestinationKind::Sftp,
            DestinationKind::S3,
            DestinationKind::AzureBlob,
            DestinationKind::Http,
            DestinationKind::Email,
            DestinationKind::NetworkShare,
            DestinationKind::WebDav,
        ]
        .into_iter()
        .filter(|k| k.supports_compensate())
        .collect();
        assert_eq!(
            supporting,
            vec![
                DestinationKind::Local,
                DestinationKind::Ftp,
                DestinationKind::S3,
                DestinationKind::AzureBlob,
            ]
        );
    }

    #[test]
    fn hashable_fields_are_independent_of_json_key_order() {
        let a = Destination {
            id: DestinationId::new(),
            name: "archive".into(),
            kind: DestinationKind::S3,
            configuration: serde_json::json!({"bucket": "b", "region": "r"}),
            active: true,
            integrity_hash: String::new(),
        };
        let b = Destination {
            configuration: serde_json::json!({"region": "r", "bucket": "b"}),
            ..a.clone()
        };
        assert_eq!(a.hashable_fields(), b.hashable_fields());
    }
}
