use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ExecutionId, ProfileId};

/// One tracked row's delta-sync fingerprint (§3 "Delta Sync State").
/// Primary key is `(profile_id, reef_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaSyncState {
    pub profile_id: ProfileId,
    pub reef_id: String,
    pub row_hash: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub last_seen_execution_id: ExecutionId,
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DeltaSyncState {
    /// A fresh entry born on first sighting of `reef_id` in a run.
    pub fn first_seen(
        profile_id: ProfileId,
        reef_id: String,
        row_hash: String,
        execution_id: ExecutionId,
    ) -> Self {
        let now = Utc::now();
        Self {
            profile_id,
            reef_id,
            row_hash,
            first_seen_at: now,
            last_seen_at: now,
            last_seen_execution_id: execution_id,
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// Update `row_hash` and `last_seen_*` on a repeat sighting, reviving
    /// the entry if it had previously been marked deleted.
    pub fn touch(&mut self, row_hash: String, execution_id: ExecutionId) {
        self.row_hash = row_hash;
        self.last_seen_at = Utc::now();
        self.last_seen_execution_id = execution_id;
        self.is_deleted = false;
        self.deleted_at = None;
    }

    /// Flip `is_deleted` when the entry was absent on a "track deletes" run.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.deleted_at = Some(Utc::now());
    }
}
