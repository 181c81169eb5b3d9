use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::delta_config::DeltaSyncConfig;
use crate::ids::{ConnectionId, DestinationId, ProfileId};
use crate::schedule::{Schedule, ScheduleError};

/// Output format for a non-email profile's rendered payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Csv,
    Json,
    Xml,
    Excel,
    Custom,
}

/// Splitting configuration: partition rows into one file per
/// `split_key_column` value (§4.C8 phase 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_key_column: Option<String>,
    pub filename_template: String,
    pub batch_size: u32,
    #[serde(default)]
    pub post_process_per_split: bool,
}

/// Email-export fields, present only when `is_email_export` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailExportConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipients_hardcoded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub attachment_config: Option<Value>,
    #[serde(default)]
    pub approval_required: bool,
    #[serde(default = "default_success_threshold")]
    pub success_threshold_percent: f64,
}

fn default_success_threshold() -> f64 {
    100.0
}

/// A unit of scheduled export work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    /// Unique short code, e.g. `P-0042`.
    pub code: String,
    pub name: String,
    pub connection_id: ConnectionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub query: String,
    pub schedule: Schedule,
    pub output_format: OutputFormat,
    pub destination_id: DestinationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub pre_process: Option<Value>,
    #[serde(default)]
    pub post_process: Option<Value>,
    pub split: SplitConfig,
    pub is_email_export: bool,
    #[serde(default)]
    pub email_export: Option<EmailExportConfig>,
    pub delta_sync: DeltaSyncConfig,
    /// Run post-process even when the query returned zero rows (§4.C8
    /// phase 9). Defaults to skipping, since an empty result is usually a
    /// source problem rather than something post-process should act on.
    #[serde(default)]
    pub on_zero_rows: bool,
    /// On post-process failure, log and continue rather than failing the
    /// execution. Mutually exclusive in practice with `rollback_on_failure`;
    /// if both are set, `rollback_on_failure` wins.
    #[serde(default)]
    pub skip_on_failure: bool,
    /// On post-process failure, call `compensate` on every delivered split
    /// to undo the delivery (§4.C6) instead of leaving files in place.
    #[serde(default)]
    pub rollback_on_failure: bool,
    pub enabled: bool,
    pub integrity_hash: String,
}

/// Errors raised validating a [`Profile`] before it is written to the
/// catalog (§3 Profile invariants).
#[derive(Debug, thiserror::Error)]
pub enum ProfileValidationError {
    #[error("schedule invalid: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("split_enabled requires split_key_column")]
    MissingSplitKeyColumn,
    #[error("split_batch_size must be >= 1")]
    ZeroSplitBatchSize,
    #[error("email_export requires recipients_column or recipients_hardcoded")]
    MissingEmailRecipients,
}

impl Profile {
    /// Validate the cross-field invariants from §3.
    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        self.schedule.validate()?;

        if self.split.enabled && !self.is_email_export {
            if self.split.split_key_column.is_none() {
                return Err(ProfileValidationError::MissingSplitKeyColumn);
            }
            if self.split.batch_size == 0 {
                return Err(ProfileValidationError::ZeroSplitBatchSize);
            }
        }

        if self.is_email_export {
            let has_recipients = self
                .email_export
                .as_ref()
                .map(|cfg| {
                    cfg.recipients_column.is_some() || cfg.recipients_hardcoded.is_some()
                })
                .unwrap_or(false);
            if !has_recipients {
                return Err(ProfileValidationError::MissingEmailRecipients);
            }
        }

        Ok(())
    }

    /// Fields that feed [`reef_hash`]'s business-field hash, in the order
    /// the hasher will canonicalise them (lexicographic by field name).
    /// Timestamps and the stored `integrity_hash` itself are excluded.
    pub fn hashable_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("connection_id", self.connection_id.to_string()),
            ("destination_id", self.destination_id.to_string()),
            ("enabled", self.enabled.to_string()),
            ("is_email_export", self.is_email_export.to_string()),
            ("name", self.name.clone()),
            ("output_format", format!("{:?}", self.output_format)),
            ("query", self.query.clone()),
            ("schedule", format!("{:?}", self.schedule)),
        ]
    }
}
