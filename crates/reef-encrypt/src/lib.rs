//! Hybrid RSA-OAEP + AES-256-GCM encryption service (§4.C1).
//!
//! Every secret Reef writes to the catalog — connection strings,
//! destination credentials — is stored ciphertext-at-rest under the
//! `"PWENC:"` marker. A fresh symmetric key is generated per call and
//! wrapped under a self-managed RSA keypair, so the only long-lived secret
//! on disk is the RSA private key, itself wrapped under a key derived from
//! an operator-supplied master secret.

mod keystore;
mod master_secret;
mod secrets;

use aes_gcm::aead::{Aead, KeyInit, OsRng as AeadOsRng, rand_core::RngCore};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::path::Path;

pub use keystore::{default_key_dir, KEY_IDENTITY_FILE, PUBLIC_KEY_FILE, WRAPPED_PRIVATE_KEY_FILE};
pub use master_secret::load_master_secret;

use keystore::KeyStore;

/// Wire-format prefix every ciphertext produced by this crate carries.
pub const PWENC_PREFIX: &str = "PWENC:";

const SYMMETRIC_KEY_SIZE: usize = 32;
const GCM_NONCE_SIZE: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum EncryptError {
    #[error("failed to read or write the key directory")]
    KeyDirectoryIo(#[source] std::io::Error),
    #[error("failed to generate RSA keypair: {0}")]
    KeyGeneration(String),
    #[error(
        "private key could not be unwrapped - the master secret may have changed; delete the key directory to regenerate"
    )]
    KeyUnreadable,
    #[error("ciphertext is malformed: {0}")]
    MalformedCiphertext(String),
    #[error("RSA operation failed: {0}")]
    Rsa(String),
    #[error("AES-GCM operation failed")]
    Aead,
}

/// The encryption service. One instance owns the loaded (or freshly
/// generated) RSA keypair for a catalog.
pub struct Encryptor {
    keystore: KeyStore,
}

impl Encryptor {
    /// Open (or initialize) the encryption service backed by the hidden
    /// key directory under `catalog_dir` (§6 default `.reef-keys/`).
    pub fn open(catalog_dir: &Path, master_secret: &str) -> Result<Self, EncryptError> {
        let key_dir = default_key_dir(catalog_dir);
        let keystore = KeyStore::load_or_generate(&key_dir, master_secret)?;
        Ok(Self { keystore })
    }

    /// `true` iff `text` begins with the `"PWENC:"` marker.
    pub fn is_encrypted(text: &str) -> bool {
        text.starts_with(PWENC_PREFIX)
    }

    /// Encrypt `plaintext`, returning `PWENC: <base64 rsa(key‖iv)> :: <base64 ciphertext>`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptError> {
        let mut symmetric_key = [0u8; SYMMETRIC_KEY_SIZE];
        let mut nonce_bytes = [0u8; GCM_NONCE_SIZE];
        AeadOsRng.fill_bytes(&mut symmetric_key);
        AeadOsRng.fill_bytes(&mut nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&symmetric_key)
            .expect("32-byte key is valid for AES-256-GCM");
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| EncryptError::Aead)?;

        let mut key_iv = Vec::with_capacity(SYMMETRIC_KEY_SIZE + GCM_NONCE_SIZE);
        key_iv.extend_from_slice(&symmetric_key);
        key_iv.extend_from_slice(&nonce_bytes);

        let mut rng = rsa::rand_core::OsRng;
        let wrapped_key_iv = self
            .keystore
            .public_key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), &key_iv)
            .map_err(|e| EncryptError::Rsa(e.to_string()))?;

        Ok(format!(
            "{PWENC_PREFIX} {} :: {}",
            BASE64.encode(wrapped_key_iv),
            BASE64.encode(ciphertext)
        ))
    }

    /// Decrypt `text`. If `text` lacks the `"PWENC:"` prefix, it is
    /// returned unchanged unless blank (§4.C1 contract).
    pub fn decrypt(&self, text: &str) -> Result<String, EncryptError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        if !Self::is_encrypted(text) {
            return Ok(text.to_string());
        }

        let body = text[PWENC_PREFIX.len()..].trim();
        let (wrapped_b64, ciphertext_b64) = body
            .split_once("::")
            .ok_or_else(|| EncryptError::MalformedCiphertext("missing '::' separator".into()))?;

        let wrapped_key_iv = BASE64
            .decode(wrapped_b64.trim())
            .map_err(|e| EncryptError::MalformedCiphertext(e.to_string()))?;
        let ciphertext = BASE64
            .decode(ciphertext_b64.trim())
            .map_err(|e| EncryptError::MalformedCiphertext(e.to_string()))?;

        let key_iv = self
            .keystore
            .private_key
            .decrypt(Oaep::new::<Sha256>(), &wrapped_key_iv)
            .map_err(|e| EncryptError::Rsa(e.to_string()))?;
        if key_iv.len() != SYMMETRIC_KEY_SIZE + GCM_NONCE_SIZE {
            return Err(EncryptError::MalformedCiphertext(
                "unwrapped key/IV has unexpected length".into(),
            ));
        }
        let (symmetric_key, nonce_bytes) = key_iv.split_at(SYMMETRIC_KEY_SIZE);

        let cipher = Aes256Gcm::new_from_slice(symmetric_key)
            .expect("32-byte key is valid for AES-256-GCM");
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_slice())
            .map_err(|_| EncryptError::Aead)?;

        String::from_utf8(plaintext)
            .map_err(|e| EncryptError::MalformedCiphertext(e.to_string()))
    }

    /// Borrow the loaded public key, e.g. for re-wrapping during key
    /// rotation tooling.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.keystore.public_key
    }

    #[cfg(test)]
    fn private_key(&self) -> &RsaPrivateKey {
        &self.keystore.private_key
    }
}
