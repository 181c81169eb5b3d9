use serde::{Deserialize, Serialize};

/// Supported content-hash algorithms for delta sync (§4.C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
    Md5,
}

/// Policy for duplicate `ReefId`s within one input batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStrategy {
    #[default]
    Strict,
    Skip,
}

/// Policy for a null/missing `ReefId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullStrategy {
    #[default]
    Strict,
    Skip,
    Generate,
}

/// A single `ReefId` normalisation step, applied in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReefIdNormalization {
    Trim,
    Lowercase,
    RemoveWhitespace,
}

/// Per-profile delta-sync configuration (§4.C4 "Inputs per run").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaSyncConfig {
    pub enabled: bool,
    pub reef_id_column: String,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    #[serde(default)]
    pub duplicate_strategy: DuplicateStrategy,
    #[serde(default)]
    pub null_strategy: NullStrategy,
    #[serde(default = "default_numeric_precision")]
    pub numeric_precision: u32,
    #[serde(default)]
    pub reef_id_normalization: Vec<ReefIdNormalization>,
    #[serde(default)]
    pub remove_non_printable: bool,
    #[serde(default)]
    pub track_deletes: bool,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default)]
    pub reset_on_schema_change: bool,
}

fn default_numeric_precision() -> u32 {
    6
}

fn default_retention_days() -> i64 {
    90
}

impl Default for DeltaSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            reef_id_column: String::new(),
            hash_algorithm: HashAlgorithm::default(),
            duplicate_strategy: DuplicateStrategy::default(),
            null_strategy: NullStrategy::default(),
            numeric_precision: default_numeric_precision(),
            reef_id_normalization: Vec::new(),
            remove_non_printable: false,
            track_deletes: false,
            retention_days: default_retention_days(),
            reset_on_schema_change: false,
        }
    }
}
