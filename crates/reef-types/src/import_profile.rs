use serde::{Deserialize, Serialize};

use crate::delta_config::DeltaSyncConfig;
use crate::destination::DestinationKind;
use crate::ids::{ConnectionId, ImportProfileId};

/// Supported ingestion file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Json,
    Xml,
    FixedWidth,
}

/// Which source item(s) to pick up when more than one is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    Oldest,
    #[default]
    Newest,
    All,
}

/// A single source→target column mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source: String,
    pub target: String,
    pub datatype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub skip_on_null: bool,
    #[serde(default)]
    pub is_key: bool,
}

/// How a batch of mapped rows is applied to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    Insert,
    Upsert,
    FullReplace,
    Append,
}

/// Where ingested rows land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportTargetKind {
    Database,
    LocalFile,
}

/// What to do when a stage of the import pipeline reports a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    Fail,
    Skip,
}

/// Row-level failure action, which additionally allows `Continue`
/// (distinct from `Skip`: `Continue` still charges the row as failed but
/// keeps processing the batch — see §4.C9 phase 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFailureAction {
    Fail,
    Skip,
    Continue,
}

/// Abort thresholds and per-stage failure policy (§4.C9, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePolicy {
    #[serde(default = "default_fail")]
    pub on_source_failure: FailureAction,
    #[serde(default = "default_fail")]
    pub on_parse_failure: FailureAction,
    #[serde(default = "default_row_fail")]
    pub on_row_failure: RowFailureAction,
    #[serde(default = "default_fail")]
    pub on_constraint_violation: FailureAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failed_rows_before_abort: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failed_rows_percent: Option<f64>,
    #[serde(default)]
    pub rollback_on_abort: bool,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

fn default_fail() -> FailureAction {
    FailureAction::Fail
}

fn default_row_fail() -> RowFailureAction {
    RowFailureAction::Fail
}

fn default_retry_count() -> u32 {
    3
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            on_source_failure: FailureAction::Fail,
            on_parse_failure: FailureAction::Fail,
            on_row_failure: RowFailureAction::Fail,
            on_constraint_violation: FailureAction::Fail,
            max_failed_rows_before_abort: None,
            max_failed_rows_percent: None,
            rollback_on_abort: false,
            retry_count: default_retry_count(),
        }
    }
}

/// A unit of scheduled ingestion work — the import-side mirror of
/// [`crate::profile::Profile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProfile {
    pub id: ImportProfileId,
    pub code: String,
    pub name: String,
    pub source_kind: DestinationKind,
    pub source_configuration: serde_json::Value,
    pub file_pattern: String,
    #[serde(default)]
    pub selection_rule: SelectionRule,
    #[serde(default)]
    pub archive_after_import: bool,
    pub source_format: SourceFormat,
    #[serde(default)]
    pub format_configuration: serde_json::Value,
    pub column_mappings: Vec<ColumnMapping>,
    pub target_kind: ImportTargetKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_connection_id: Option<ConnectionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_local_path: Option<String>,
    pub load_strategy: LoadStrategy,
    #[serde(default)]
    pub upsert_key_columns: Vec<String>,
    pub batch_size: u32,
    pub failure_policy: FailurePolicy,
    pub delta_sync: DeltaSyncConfig,
    pub enabled: bool,
    pub integrity_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_policy_defaults_match_spec() {
        let policy = FailurePolicy::default();
        assert_eq!(policy.on_source_failure, FailureAction::Fail);
        assert_eq!(policy.on_row_failure, RowFailureAction::Fail);
        assert_eq!(policy.retry_count, 3);
    }

    #[test]
    fn row_failure_continue_is_distinct_from_skip() {
        assert_ne!(RowFailureAction::Continue, RowFailureAction::Skip);
    }
}
