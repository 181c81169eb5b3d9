//! Bounded-concurrency job scheduler (§4.C10): a `tokio`-based
//! producer/consumer over the catalog's due jobs, with a priority queue,
//! per-job non-blocking locks, and cascading cancellation.

pub mod config;
pub mod error;
pub mod executor;
pub mod next_run;
pub mod queue;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use error::{Result, SchedulerError};
pub use executor::{DefaultExecutor, JobExecutor};
pub use next_run::compute_next_run;
pub use queue::JobQueue;
pub use scheduler::Scheduler;

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use reef_catalog::InMemoryCatalogStore;
    use reef_types::{Execution, ExecutionStatus, Job, JobId, ProfileId, TriggerSource};

    use super::*;

    struct CountingExecutor {
        calls: AtomicUsize,
        succeed: bool,
    }

    impl JobExecutor for CountingExecutor {
        fn execute_profile(&self, profile_id: ProfileId, triggered_by: TriggerSource) -> Result<Execution> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut execution = Execution::new_running(profile_id, triggered_by);
            let status = if self.succeed { ExecutionStatus::Success } else { ExecutionStatus::Failed };
            execution.finish(status, None);
            Ok(execution)
        }
    }

    fn due_job(priority: i32) -> Job {
        Job {
            id: JobId::new(),
            name: "t".into(),
            profile_ids: vec![ProfileId::new()],
            priority,
            allow_concurrent: false,
            timeout_minutes: 5,
            max_retries: 1,
            consecutive_failures: 0,
            next_run_time: Utc::now() - chrono::Duration::minutes(1),
            is_enabled: true,
        }
    }

    #[tokio::test]
    async fn producer_enqueues_due_jobs_and_worker_runs_them() {
        let catalog: Arc<dyn reef_catalog::CatalogStore> = Arc::new(InMemoryCatalogStore::new());
        let job = due_job(5);
        catalog.put_job(job.clone()).expect("put job");

        let executor = Arc::new(CountingExecutor { calls: AtomicUsize::new(0), succeed: true });
        let config = SchedulerConfig::new(2, 5);
        let scheduler = Arc::new(Scheduler::new(catalog.clone(), executor.clone(), config));

        scheduler.repair_stale_schedules().expect("repair");

        let run_handle = tokio::spawn(scheduler.clone().run());
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        scheduler.shutdown();
        let _ = run_handle.await;

        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        let stored = catalog.get_job(job.id).expect("get job").expect("present");
        assert_eq!(stored.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn failing_job_increments_consecutive_failures() {
        let catalog: Arc<dyn reef_catalog::CatalogStore> = Arc::new(InMemoryCatalogStore::new());
        let job = due_job(5);
        catalog.put_job(job.clone()).expect("put job");

        let executor = Arc::new(CountingExecutor { calls: AtomicUsize::new(0), succeed: false });
        let config = SchedulerConfig::new(2, 5);
        let scheduler = Arc::new(Scheduler::new(catalog.clone(), executor.clone(), config));

        let run_handle = tokio::spawn(scheduler.clone().run());
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        scheduler.shutdown();
        let _ = run_handle.await;

        let stored = catalog.get_job(job.id).expect("get job").expect("present");
        assert_eq!(stored.consecutive_failures, 1);
    }
}
