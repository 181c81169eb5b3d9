use std::time::Duration;

use reef_duration::clamp_u32;

/// §4.C10: `W = max(2, max_concurrent_jobs)` consumer workers, one producer
/// ticking every `check_interval_seconds`.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub max_concurrent_jobs: u32,
    pub check_interval_seconds: u32,
    /// How long a job's `next_run_time` may sit in the past before the
    /// startup corruption sweep recomputes it.
    pub corruption_grace: Duration,
    /// Window given to running jobs to observe cancellation before queues
    /// are torn down.
    pub shutdown_grace: Duration,
}

impl SchedulerConfig {
    pub fn new(max_concurrent_jobs: u32, check_interval_seconds: u32) -> Self {
        Self {
            max_concurrent_jobs: clamp_u32(max_concurrent_jobs, 1, 100),
            check_interval_seconds: clamp_u32(check_interval_seconds, 5, 300),
            corruption_grace: Duration::from_secs(300),
            shutdown_grace: Duration::from_secs(2),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.max_concurrent_jobs.max(2) as usize
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds as u64)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        let config = SchedulerConfig::new(0, 1);
        assert_eq!(config.max_concurrent_jobs, 1);
        assert_eq!(config.check_interval_seconds, 5);

        let config = SchedulerConfig::new(500, 10_000);
        assert_eq!(config.max_concurrent_jobs, 100);
        assert_eq!(config.check_interval_seconds, 300);
    }

    #[test]
    fn worker_count_is_at_least_two() {
        assert_eq!(SchedulerConfig::new(1, 10).worker_count(), 2);
        assert_eq!(SchedulerConfig::new(10, 10).worker_count(), 10);
    }
}
