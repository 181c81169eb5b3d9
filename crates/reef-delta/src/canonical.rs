use std::collections::BTreeSet;

use base64::Engine;
use chrono::SecondsFormat;
use reef_types::{ColumnValue, DeltaSyncConfig, HashAlgorithm, ReefIdNormalization, Row};
use unicode_normalization::UnicodeNormalization;

const BOM: char = '\u{FEFF}';

/// Pull the raw (pre-normalisation) `ReefId` out of a row, or `None` if the
/// column is absent or the value is null.
pub fn raw_reef_id(row: &Row, column: &str) -> Option<String> {
    match row.get(column) {
        None | Some(ColumnValue::Null) => None,
        Some(ColumnValue::Text(text)) => Some(text.clone()),
        Some(ColumnValue::Int(i)) => Some(i.to_string()),
        Some(ColumnValue::Float(f)) => Some(f.to_string()),
        Some(ColumnValue::Bool(b)) => Some(b.to_string()),
        Some(ColumnValue::Bytes(bytes)) => {
            Some(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        Some(ColumnValue::Timestamp(ts)) => Some(ts.to_rfc3339()),
    }
}

/// Apply `Trim` / `Lowercase` / `RemoveWhitespace` in declaration order.
pub fn normalize_reef_id(raw: &str, steps: &[ReefIdNormalization]) -> String {
    let mut value = raw.to_string();
    for step in steps {
        value = match step {
            ReefIdNormalization::Trim => value.trim().to_string(),
            ReefIdNormalization::Lowercase => value.to_lowercase(),
            ReefIdNormalization::RemoveWhitespace => {
                value.chars().filter(|c| !c.is_whitespace()).collect()
            }
        };
    }
    value
}

/// Canonicalise a single cell per §4.C4's value rules.
pub fn canonicalize_value(value: &ColumnValue, config: &DeltaSyncConfig) -> String {
    match value {
        ColumnValue::Null => "NULL".to_string(),
        ColumnValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        ColumnValue::Int(i) => i.to_string(),
        ColumnValue::Float(f) => format!("{:.*}", config.numeric_precision as usize, f),
        ColumnValue::Bytes(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
        ColumnValue::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Nanos, true),
        ColumnValue::Text(text) => canonicalize_text(text, config.remove_non_printable),
    }
}

fn canonicalize_text(text: &str, remove_non_printable: bool) -> String {
    let stripped = text.strip_prefix(BOM).unwrap_or(text);
    let normalized: String = stripped.nfc().collect();
    if remove_non_printable {
        normalized.chars().filter(|c| !is_control_or_format(*c)).collect()
    } else {
        normalized
    }
}

/// Approximates Unicode general category "C" (control/format/surrogate/
/// private-use/unassigned) using the classification `char` exposes
/// directly; a full category table is more than this normalisation step
/// needs.
fn is_control_or_format(c: char) -> bool {
    c.is_control() || c == BOM
}

/// Build the `REEFID:<id>|k=v;...` canonical string a row hashes to.
pub fn build_canonical_row(row: &Row, normalized_reef_id: &str, config: &DeltaSyncConfig) -> String {
    let mut canonical = format!("REEFID:{normalized_reef_id}|");
    for (key, value) in row {
        canonical.push_str(key);
        canonical.push('=');
        canonical.push_str(&canonicalize_value(value, config));
        canonical.push(';');
    }
    canonical
}

/// Hash a row under the profile's configured algorithm.
pub fn row_hash(row: &Row, normalized_reef_id: &str, config: &DeltaSyncConfig) -> String {
    let canonical = build_canonical_row(row, normalized_reef_id, config);
    reef_hash::digest_with(config.hash_algorithm, &canonical)
}

/// Fingerprint the column names seen across `rows`, used to detect an
/// upstream schema change between runs (§4.C4 pre-run validation). Always
/// hashed with SHA-256, independent of the profile's row-hash algorithm,
/// since this fingerprints structure rather than content.
pub fn schema_fingerprint(rows: &[Row]) -> String {
    let mut columns = BTreeSet::new();
    for row in rows {
        columns.extend(row.keys().cloned());
    }
    let canonical = columns.into_iter().collect::<Vec<_>>().join(",");
    reef_hash::digest_with(HashAlgorithm::Sha256, &canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn null_bool_and_numeric_rules() {
        let config = DeltaSyncConfig::default();
        assert_eq!(canonicalize_value(&ColumnValue::Null, &config), "NULL");
        assert_eq!(canonicalize_value(&ColumnValue::Bool(true), &config), "TRUE");
        assert_eq!(canonicalize_value(&ColumnValue::Bool(false), &config), "FALSE");
        assert_eq!(
            canonicalize_value(&ColumnValue::Float(1.23456789), &config),
            "1.234568"
        );
    }

    #[test]
    fn normalize_reef_id_applies_steps_in_order() {
        let steps = vec![
            ReefIdNormalization::Trim,
            ReefIdNormalization::Lowercase,
            ReefIdNormalization::RemoveWhitespace,
        ];
        assert_eq!(normalize_reef_id("  A B C  ", &steps), "abc");
    }

    #[test]
    fn row_hash_is_stable_and_sensitive_to_content() {
        let config = DeltaSyncConfig::default();
        let mut row: Row = BTreeMap::new();
        row.insert("name".into(), ColumnValue::Text("alice".into()));

        let a = row_hash(&row, "1", &config);
        let b = row_hash(&row, "1", &config);
        assert_eq!(a, b);

        row.insert("name".into(), ColumnValue::Text("bob".into()));
        let c = row_hash(&row, "1", &config);
        assert_ne!(a, c);
    }

    #[test]
    fn bom_is_stripped_before_hashing() {
        let config = DeltaSyncConfig::default();
        assert_eq!(canonicalize_text("\u{FEFF}hello", false), "hello");
    }

    #[test]
    fn schema_fingerprint_ignores_row_order_and_values() {
        let mut a: Row = BTreeMap::new();
        a.insert("id".into(), ColumnValue::Int(1));
        a.insert("name".into(), ColumnValue::Text("alice".into()));

        let mut b: Row = BTreeMap::new();
        b.insert("name".into(), ColumnValue::Text("bob".into()));
        b.insert("id".into(), ColumnValue::Int(2));

        assert_eq!(schema_fingerprint(&[a.clone()]), schema_fingerprint(&[b]));

        let mut c = a.clone();
        c.insert("extra".into(), ColumnValue::Null);
        assert_ne!(schema_fingerprint(&[a]), schema_fingerprint(&[c]));
    }
}
