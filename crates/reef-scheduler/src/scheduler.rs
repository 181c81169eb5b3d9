use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reef_catalog::CatalogStore;
use reef_types::{ExecutionStatus, Job, JobId, TriggerSource};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::executor::JobExecutor;
use crate::queue::JobQueue;

/// Per-job non-blocking mutex, live only while a job is actually running.
type RunningJobs = AsyncMutex<HashMap<JobId, Arc<AsyncMutex<()>>>>;

/// Fixed cadence for [`Scheduler::housekeeping_loop`] (§4.C3's "every 10
/// minutes"), independent of the configurable job-polling interval.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(600);

/// §4.C10: a tokio-based producer/consumer pair over the catalog's due
/// jobs. The producer ticks on `check_interval_seconds`; `worker_count`
/// workers each hold a semaphore permit for the lifetime of one job run.
///
/// `Job` carries its own `next_run_time`/`priority`/timeout rather than a
/// `Schedule` (that belongs to the `Profile`s it composes), so a job's
/// cadence after each run falls back to the "otherwise now + 1h" rule
/// (§4.C10 next-run calculation) unless something external (the CLI,
/// re-reading a profile's schedule) rewrites `next_run_time` first.
pub struct Scheduler<E: JobExecutor> {
    catalog: Arc<dyn CatalogStore>,
    executor: Arc<E>,
    config: SchedulerConfig,
    queue: Arc<JobQueue>,
    running: Arc<RunningJobs>,
    slots: Arc<Semaphore>,
    supervisor: CancellationToken,
}

impl<E: JobExecutor + 'static> Scheduler<E> {
    pub fn new(catalog: Arc<dyn CatalogStore>, executor: Arc<E>, config: SchedulerConfig) -> Self {
        Self {
            catalog,
            executor,
            slots: Arc::new(Semaphore::new(config.max_concurrent_jobs as usize)),
            config,
            queue: Arc::new(JobQueue::new()),
            running: Arc::new(AsyncMutex::new(HashMap::new())),
            supervisor: CancellationToken::new(),
        }
    }

    /// A token that cancels when [`Self::shutdown`] is called; pass its
    /// children into any long-running work spawned on this scheduler's
    /// behalf.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.supervisor.child_token()
    }

    /// Recompute `next_run_time` for any enabled job whose stored value is
    /// further in the past than `corruption_grace` allows (§4.C10 startup
    /// corruption sweep).
    pub fn repair_stale_schedules(&self) -> Result<(), SchedulerError> {
        let now = Utc::now();
        for mut job in self.catalog.list_jobs()? {
            if !job.is_enabled {
                continue;
            }
            let overdue = now - job.next_run_time;
            if overdue > chrono::Duration::from_std(self.config.corruption_grace).unwrap_or_default() {
                job.next_run_time = now + chrono::Duration::hours(1);
                self.catalog.put_job(job)?;
            }
        }
        Ok(())
    }

    /// Run the producer, worker pool and housekeeping tick until
    /// [`Self::shutdown`] is called.
    pub async fn run(self: Arc<Self>) {
        let producer = tokio::spawn(self.clone().producer_loop());
        let housekeeping = tokio::spawn(self.clone().housekeeping_loop());
        let mut workers = Vec::with_capacity(self.config.worker_count());
        for _ in 0..self.config.worker_count() {
            workers.push(tokio::spawn(self.clone().worker_loop()));
        }

        self.supervisor.cancelled().await;
        producer.abort();
        housekeeping.abort();
        tokio::time::sleep(self.config.shutdown_grace).await;
        for worker in workers {
            worker.abort();
        }
        self.queue.clear().await;
    }

    /// Cascades cancellation to every job-linked token and tears down the
    /// queue after a short grace window (§4.C10 shutdown flow).
    pub fn shutdown(&self) {
        self.supervisor.cancel();
    }

    async fn producer_loop(self: Arc<Self>) {
        let mut tick = tokio::time::interval(self.config.check_interval());
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.enqueue_due_jobs().await;
                }
                _ = self.supervisor.cancelled() => {
                    break;
                }
            }
        }
    }

    /// §4.C3/§4.C4: a fixed ten-minute tick, independent of
    /// `check_interval_seconds`, that evicts stale throttle entries and
    /// prunes retained delta-sync tombstones through the executor.
    async fn housekeeping_loop(self: Arc<Self>) {
        let mut tick = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        tick.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let executor = self.executor.clone();
                    let _ = tokio::task::spawn_blocking(move || executor.housekeeping()).await;
                }
                _ = self.supervisor.cancelled() => {
                    break;
                }
            }
        }
    }

    async fn enqueue_due_jobs(&self) {
        let jobs = match self.catalog.list_jobs() {
            Ok(jobs) => jobs,
            Err(_) => return,
        };
        let now = Utc::now();
        for job in jobs {
            if job.is_enabled && job.next_run_time <= now {
                self.queue.enqueue(job).await;
            }
        }
    }

    async fn worker_loop(self: Arc<Self>) {
        loop {
            // Acquire this worker's slot before dequeueing, not after, so a
            // job only comes off the priority heap once a slot is actually
            // free. Dequeueing first would let a lower-priority job that
            // was pulled earlier race a higher-priority job dequeued later
            // for a freshly-freed permit, since `Semaphore` grants permits
            // in waiter-arrival order rather than job priority.
            let Ok(permit) = self.slots.clone().acquire_owned().await else {
                break;
            };

            let job = tokio::select! {
                job = self.queue.dequeue() => job,
                _ = self.supervisor.cancelled() => break,
            };

            if !job.allow_concurrent && self.job_currently_running(job.id).await {
                self.queue.finish(job.id).await;
                drop(permit);
                continue;
            }

            let job_lock = self.job_lock(job.id).await;
            let Ok(_guard) = job_lock.try_lock() else {
                self.queue.finish(job.id).await;
                drop(permit);
                continue;
            };

            self.mark_running(job.id).await;
            self.run_one_job(job.clone()).await;
            self.mark_finished(job.id).await;
            self.queue.finish(job.id).await;
            drop(permit);
        }
    }

    /// Worker loop body: invoke the executor for every profile in the job,
    /// within the job's `timeout_minutes`, cascading from the supervisor's
    /// cancellation token, then persist the circuit-breaker update and next
    /// run time.
    async fn run_one_job(&self, mut job: Job) {
        let token = self.supervisor.child_token();
        let timeout = Duration::from_secs(job.timeout_minutes as u64 * 60);
        let executor = self.executor.clone();
        let profile_ids = job.profile_ids.clone();

        let run = tokio::task::spawn_blocking(move || {
            let mut any_failed = false;
            for profile_id in profile_ids {
                let outcome = executor.execute_profile(profile_id, TriggerSource::Schedule);
                let failed = match outcome {
                    Ok(execution) => {
                        !matches!(execution.status, ExecutionStatus::Success | ExecutionStatus::PartialSuccess)
                    }
                    Err(_) => true,
                };
                any_failed |= failed;
            }
            any_failed
        });

        let failed = tokio::select! {
            result = run => result.unwrap_or(true),
            _ = tokio::time::sleep(timeout) => {
                token.cancel();
                true
            }
            _ = token.cancelled() => true,
        };

        if failed {
            job.record_failure();
        } else {
            job.record_success();
        }
        if job.is_enabled {
            job.next_run_time = Utc::now() + chrono::Duration::hours(1);
        }
        let _ = self.catalog.put_job(job);
    }

    async fn job_currently_running(&self, job_id: JobId) -> bool {
        self.running.lock().await.contains_key(&job_id)
    }

    async fn job_lock(&self, job_id: JobId) -> Arc<AsyncMutex<()>> {
        let mut running = self.running.lock().await;
        running.entry(job_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    async fn mark_running(&self, job_id: JobId) {
        self.running.lock().await.entry(job_id).or_insert_with(|| Arc::new(AsyncMutex::new(())));
    }

    async fn mark_finished(&self, job_id: JobId) {
        self.running.lock().await.remove(&job_id);
    }
}
