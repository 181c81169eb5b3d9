//! Self-managed RSA keypair, wrapped at rest under a symmetric key derived
//! from the master secret (§4.C1, §6 "Key storage detail").

use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit, OsRng as AeadOsRng, rand_core::RngCore};
use aes_gcm::{Aes256Gcm, Nonce};
use pbkdf2::pbkdf2_hmac_array;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::EncryptError;

const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const PBKDF2_ITERATIONS: u32 = 100_000;
const KEY_SIZE: usize = 32;
const RSA_MODULUS_BITS: usize = 2048;

/// Reserved filenames under the hidden key directory (§6).
pub const WRAPPED_PRIVATE_KEY_FILE: &str = "recovery.baklz4";
pub const PUBLIC_KEY_FILE: &str = "snapshot_blob.bin";
pub const KEY_IDENTITY_FILE: &str = "store.jsonc";

#[derive(Debug, Serialize, Deserialize)]
struct KeyIdentity {
    key_id: String,
    algorithm: String,
}

pub struct KeyStore {
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
}

impl KeyStore {
    /// Load the keypair from `dir`, generating and persisting a fresh one
    /// if the directory doesn't exist yet. `dir` is the hidden directory
    /// next to the catalog root (default `.reef-keys/`).
    pub fn load_or_generate(dir: &Path, master_secret: &str) -> Result<Self, EncryptError> {
        let wrapped_path = dir.join(WRAPPED_PRIVATE_KEY_FILE);

        if !wrapped_path.exists() {
            return Self::generate_and_persist(dir, master_secret);
        }

        let wrapped = fs::read(&wrapped_path).map_err(EncryptError::KeyDirectoryIo)?;
        let private_der = unwrap_private_key(&wrapped, master_secret)?;
        let private_key = RsaPrivateKey::from_pkcs1_der(&private_der)
            .map_err(|_| EncryptError::KeyUnreadable)?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok(Self {
            private_key,
            public_key,
        })
    }

    fn generate_and_persist(dir: &Path, master_secret: &str) -> Result<Self, EncryptError> {
        fs::create_dir_all(dir).map_err(EncryptError::KeyDirectoryIo)?;

        let mut rng = rsa::rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, RSA_MODULUS_BITS)
            .map_err(|e| EncryptError::KeyGeneration(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_der = private_key
            .to_pkcs1_der()
            .map_err(|e| EncryptError::KeyGeneration(e.to_string()))?;
        let wrapped = wrap_private_key(private_der.as_bytes(), master_secret);
        fs::write(dir.join(WRAPPED_PRIVATE_KEY_FILE), &wrapped).map_err(EncryptError::KeyDirectoryIo)?;

        let public_der = public_key
            .to_pkcs1_der()
            .map_err(|e| EncryptError::KeyGeneration(e.to_string()))?;
        fs::write(dir.join(PUBLIC_KEY_FILE), public_der.as_bytes())
            .map_err(EncryptError::KeyDirectoryIo)?;

        let identity = KeyIdentity {
            key_id: uuid::Uuid::new_v4().to_string(),
            algorithm: "rsa-oaep-sha256+aes-256-gcm".to_string(),
        };
        let identity_json =
            serde_json::to_vec_pretty(&identity).map_err(|e| EncryptError::KeyGeneration(e.to_string()))?;
        fs::write(dir.join(KEY_IDENTITY_FILE), identity_json).map_err(EncryptError::KeyDirectoryIo)?;

        Ok(Self {
            private_key,
            public_key,
        })
    }
}

/// Derive a 256-bit key from the master secret using PBKDF2-SHA256, same
/// construction `reef-encrypt`'s payload cipher uses for destination
/// secrets (§4.C1 "Scheme").
fn derive_key(master_secret: &str, salt: &[u8]) -> [u8; KEY_SIZE] {
    pbkdf2_hmac_array::<Sha256, KEY_SIZE>(master_secret.as_bytes(), salt, PBKDF2_ITERATIONS)
}

fn wrap_private_key(private_der: &[u8], master_secret: &str) -> Vec<u8> {
    let mut salt = [0u8; SALT_SIZE];
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    AeadOsRng.fill_bytes(&mut salt);
    AeadOsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(master_secret, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key).expect("32-byte key is valid for AES-256-GCM");
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, private_der)
        .expect("AES-GCM encryption of a freshly generated key cannot fail");

    let mut out = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    out
}

fn unwrap_private_key(wrapped: &[u8], master_secret: &str) -> Result<Vec<u8>, EncryptError> {
    if wrapped.len() < SALT_SIZE + NONCE_SIZE + 16 {
        return Err(EncryptError::KeyUnreadable);
    }
    let salt = &wrapped[..SALT_SIZE];
    let nonce_bytes = &wrapped[SALT_SIZE..SALT_SIZE + NONCE_SIZE];
    let ciphertext = &wrapped[SALT_SIZE + NONCE_SIZE..];

    let key = derive_key(master_secret, salt);
    let cipher = Aes256Gcm::new_from_slice(&key).expect("32-byte key is valid for AES-256-GCM");
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EncryptError::KeyUnreadable)
}

/// Where the hidden key directory lives by default: `<catalog_dir>/.reef-keys`.
pub fn default_key_dir(catalog_dir: &Path) -> PathBuf {
    catalog_dir.join(".reef-keys")
}
