//! Per-kind destination secret masking (§4.C1 "Secret-field masking").

use reef_types::DestinationKind;
use serde_json::Value;

use crate::{Encryptor, EncryptError};

const SECRET_SENTINEL: &str = "[SECRET]";

fn is_secret_field(field_name: &str, kind: DestinationKind) -> bool {
    let lower = field_name.to_ascii_lowercase();
    kind.secret_fields().iter().any(|allowed| *allowed == lower)
}

impl Encryptor {
    /// Walk `configuration`'s top-level object case-insensitively; encrypt
    /// any string leaf whose key is a secret field for `kind` and isn't
    /// already ciphertext.
    pub fn encrypt_secrets(&self, configuration: &mut Value, kind: DestinationKind) -> Result<(), EncryptError> {
        let Some(map) = configuration.as_object_mut() else {
            return Ok(());
        };
        for (field, value) in map.iter_mut() {
            if !is_secret_field(field, kind) {
                continue;
            }
            if let Value::String(plain) = value {
                if !Encryptor::is_encrypted(plain) {
                    *plain = self.encrypt(plain)?;
                }
            }
        }
        Ok(())
    }

    /// Inverse of [`Self::encrypt_secrets`].
    pub fn decrypt_secrets(&self, configuration: &mut Value, kind: DestinationKind) -> Result<(), EncryptError> {
        let Some(map) = configuration.as_object_mut() else {
            return Ok(());
        };
        for (field, value) in map.iter_mut() {
            if !is_secret_field(field, kind) {
                continue;
            }
            if let Value::String(cipher) = value {
                *cipher = self.decrypt(cipher)?;
            }
        }
        Ok(())
    }

    /// Unconditionally replace each secret leaf with `"[SECRET]"`, for
    /// UI-facing reads.
    pub fn mask_secrets(configuration: &mut Value, kind: DestinationKind) {
        let Some(map) = configuration.as_object_mut() else {
            return;
        };
        for (field, value) in map.iter_mut() {
            if is_secret_field(field, kind) && value.is_string() {
                *value = Value::String(SECRET_SENTINEL.to_string());
            }
        }
    }

    /// Merge a UI-submitted `incoming` config with the `stored` one: for
    /// each secret leaf, `"[SECRET]"` means "unchanged, keep stored";
    /// anything else in `incoming` wins (and is encrypted by the caller
    /// afterward). Non-secret fields always take `incoming`.
    pub fn merge_secrets(incoming: &Value, stored: &Value, kind: DestinationKind) -> Value {
        let Some(incoming_map) = incoming.as_object() else {
            return incoming.clone();
        };
        let stored_map = stored.as_object();

        let mut merged = serde_json::Map::new();
        for (field, incoming_value) in incoming_map {
            if is_secret_field(field, kind)
                && incoming_value.as_str() == Some(SECRET_SENTINEL)
            {
                if let Some(stored_value) = stored_map.and_then(|m| m.get(field)) {
                    merged.insert(field.clone(), stored_value.clone());
                    continue;
                }
            }
            merged.insert(field.clone(), incoming_value.clone());
        }
        Value::Object(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_encryptor() -> Encryptor {
        let td = tempdir().expect("tempdir");
        Encryptor::open(td.path(), "test-master-secret").expect("encryptor")
    }

    #[test]
    fn encrypt_secrets_masks_only_allow_listed_fields() {
        let encryptor = test_encryptor();
        let mut config = serde_json::json!({
            "accesskey": "AKIA...",
            "secretkey": "shh",
            "bucket": "my-bucket",
        });
        encryptor.encrypt_secrets(&mut config, DestinationKind::S3).unwrap();

        assert!(config["accesskey"].as_str().unwrap().starts_with("PWENC:"));
        assert!(config["secretkey"].as_str().unwrap().starts_with("PWENC:"));
        assert_eq!(config["bucket"], "my-bucket");
    }

    #[test]
    fn encrypt_then_decrypt_secrets_roundtrips() {
        let encryptor = test_encryptor();
        let mut config = serde_json::json!({ "accesskey": "AKIA-original" });
        encryptor.encrypt_secrets(&mut config, DestinationKind::S3).unwrap();
        encryptor.decrypt_secrets(&mut config, DestinationKind::S3).unwrap();
        assert_eq!(config["accesskey"], "AKIA-original");
    }

    #[test]
    fn mask_secrets_replaces_with_sentinel() {
        let mut config = serde_json::json!({ "password": "hunter2", "host": "ftp.example.com" });
        Encryptor::mask_secrets(&mut config, DestinationKind::Ftp);
        assert_eq!(config["password"], "[SECRET]");
        assert_eq!(config["host"], "ftp.example.com");
    }

    #[test]
    fn merge_secrets_keeps_stored_when_incoming_is_sentinel() {
        let stored = serde_json::json!({ "password": "PWENC:real-ciphertext", "host": "old-host" });
        let incoming = serde_json::json!({ "password": "[SECRET]", "host": "new-host" });
        let merged = Encryptor::merge_secrets(&incoming, &stored, DestinationKind::Ftp);
        assert_eq!(merged["password"], "PWENC:real-ciphertext");
        assert_eq!(merged["host"], "new-host");
    }

    #[test]
    fn merge_secrets_takes_incoming_when_changed() {
        let stored = serde_json::json!({ "password": "PWENC:old" });
        let incoming = serde_json::json!({ "password": "brand-new-plaintext" });
        let merged = Encryptor::merge_secrets(&incoming, &stored, DestinationKind::Ftp);
        assert_eq!(merged["password"], "brand-new-plaintext");
    }
}
