//! Stable hashing for the tamper validator (§4.C2) and the delta-sync row
//! fingerprint (§4.C4).
//!
//! Both hashes are computed over a canonical string built from already
//! pre-sorted `(field, value)` pairs the caller assembles (`reef-types`
//! entities expose `hashable_fields()`; `reef-delta` builds its own
//! `REEFID:...` string per row). This crate only owns the "turn bytes into
//! a stable hex digest" half.

use md5::Md5;
use reef_types::HashAlgorithm;
use sha2::{Digest, Sha256, Sha512};

/// Hash a canonical field list with SHA-256, as required for entity
/// tamper detection. Rules: fields are assumed already ordered
/// lexicographically by the caller; each pair is rendered `field=value;`
/// and concatenated before hashing.
pub fn entity_hash<K: AsRef<str>, V: AsRef<str>>(fields: &[(K, V)]) -> String {
    let mut canonical = String::new();
    for (field, value) in fields {
        canonical.push_str(field.as_ref());
        canonical.push('=');
        canonical.push_str(value.as_ref());
        canonical.push(';');
    }
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Hash an arbitrary canonical string with the algorithm a delta-sync
/// profile was configured with.
pub fn digest_with(algorithm: HashAlgorithm, canonical: &str) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(canonical.as_bytes())),
        HashAlgorithm::Sha512 => hex::encode(Sha512::digest(canonical.as_bytes())),
        HashAlgorithm::Md5 => hex::encode(Md5::digest(canonical.as_bytes())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_hash_is_order_sensitive_to_input_but_deterministic() {
        let fields = vec![
            ("active".to_string(), "TRUE".to_string()),
            ("name".to_string(), "nightly-export".to_string()),
        ];
        let a = entity_hash(&fields);
        let b = entity_hash(&fields);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn entity_hash_changes_when_a_value_changes() {
        let before = vec![("name".to_string(), "nightly-export".to_string())];
        let after = vec![("name".to_string(), "weekly-export".to_string())];
        assert_ne!(entity_hash(&before), entity_hash(&after));
    }

    #[test]
    fn digest_with_picks_the_configured_algorithm() {
        let sha256 = digest_with(HashAlgorithm::Sha256, "REEFID:1|a=1;");
        let sha512 = digest_with(HashAlgorithm::Sha512, "REEFID:1|a=1;");
        let md5 = digest_with(HashAlgorithm::Md5, "REEFID:1|a=1;");
        assert_eq!(sha256.len(), 64);
        assert_eq!(sha512.len(), 128);
        assert_eq!(md5.len(), 32);
        assert_ne!(sha256, sha512);
    }
}
