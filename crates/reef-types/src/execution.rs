use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ExecutionId, ProfileId};

/// Terminal and in-flight states for a pipeline run (§3 Execution, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Success,
    PartialSuccess,
    Failed,
    Aborted,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

/// What caused this execution to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Manual,
    Schedule,
    Webhook,
    Dependency,
}

/// Outcome of one split/email group within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStatus {
    Success,
    Failed,
}

/// A single split (or per-group email) outcome recorded on an [`Execution`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRecord {
    pub split_key: String,
    pub status: SplitStatus,
    pub row_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Destination-relative path the file was written to, when delivery
    /// succeeded. Needed to call `compensate` on this split later (§4.C8
    /// phase 9 rollback-on-failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_path: Option<String>,
}

/// One attempt of a profile or import profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub profile_id: ProfileId,
    pub status: ExecutionStatus,
    pub triggered_by: TriggerSource,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rows_read: u64,
    #[serde(default)]
    pub rows_inserted: u64,
    #[serde(default)]
    pub rows_updated: u64,
    #[serde(default)]
    pub rows_skipped: u64,
    #[serde(default)]
    pub rows_failed: u64,
    #[serde(default)]
    pub rows_deleted: u64,
    #[serde(default)]
    pub bytes_processed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub phase_timings: BTreeMap<String, Duration>,
    #[serde(default)]
    pub splits: Vec<SplitRecord>,
}

impl Execution {
    pub fn new_running(profile_id: ProfileId, triggered_by: TriggerSource) -> Self {
        Self {
            id: ExecutionId::new(),
            profile_id,
            status: ExecutionStatus::Running,
            triggered_by,
            started_at: Utc::now(),
            completed_at: None,
            rows_read: 0,
            rows_inserted: 0,
            rows_updated: 0,
            rows_skipped: 0,
            rows_failed: 0,
            rows_deleted: 0,
            bytes_processed: 0,
            current_phase: None,
            error_message: None,
            phase_timings: BTreeMap::new(),
            splits: Vec::new(),
        }
    }

    /// §7: a run exceeding the import failure thresholds is `Aborted`, a
    /// run with a mix of split successes/failures is `PartialSuccess`, a
    /// fully failed run is `Failed`.
    pub fn finish(&mut self, status: ExecutionStatus, error_message: Option<String>) {
        self.status = status;
        self.error_message = error_message;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_running_execution_has_no_completed_at() {
        let exec = Execution::new_running(ProfileId::new(), TriggerSource::Schedule);
        assert_eq!(exec.status, ExecutionStatus::Running);
        assert!(exec.completed_at.is_none());
        assert!(!exec.status.is_terminal());
    }

    #[test]
    fn finish_sets_terminal_status_and_timestamp() {
        let mut exec = Execution::new_running(ProfileId::new(), TriggerSource::Manual);
        exec.finish(ExecutionStatus::Success, None);
        assert!(exec.status.is_terminal());
        assert!(exec.completed_at.is_some());
    }
}
