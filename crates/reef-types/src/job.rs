use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{JobId, ProfileId};

/// The circuit-breaking threshold from §4.C10: after this many consecutive
/// failed runs a job is disabled until a successful external retrigger.
pub const CIRCUIT_BREAKER_THRESHOLD: u32 = 10;

/// A composed scheduled unit referencing one or more profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub profile_ids: Vec<ProfileId>,
    pub priority: i32,
    pub allow_concurrent: bool,
    pub timeout_minutes: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub consecutive_failures: u32,
    pub next_run_time: DateTime<Utc>,
    pub is_enabled: bool,
}

impl Job {
    /// §4.C10 Circuit breaking.
    pub fn should_circuit_break(&self) -> bool {
        self.consecutive_failures >= CIRCUIT_BREAKER_THRESHOLD
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        if self.should_circuit_break() {
            self.is_enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_job() -> Job {
        Job {
            id: JobId::new(),
            name: "nightly".into(),
            profile_ids: vec![ProfileId::new()],
            priority: 5,
            allow_concurrent: false,
            timeout_minutes: 30,
            max_retries: 3,
            consecutive_failures: 0,
            next_run_time: Utc::now(),
            is_enabled: true,
        }
    }

    #[test]
    fn circuit_breaks_at_threshold() {
        let mut job = base_job();
        for _ in 0..CIRCUIT_BREAKER_THRESHOLD - 1 {
            job.record_failure();
        }
        assert!(job.is_enabled);
        job.record_failure();
        assert!(!job.is_enabled);
        assert_eq!(job.consecutive_failures, CIRCUIT_BREAKER_THRESHOLD);
    }

    #[test]
    fn success_resets_counter() {
        let mut job = base_job();
        job.record_failure();
        job.record_failure();
        job.record_success();
        assert_eq!(job.consecutive_failures, 0);
    }
}
