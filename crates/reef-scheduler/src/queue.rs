use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use reef_types::{Job, JobId};
use tokio::sync::{Mutex, Notify};

/// Orders by `priority` descending (higher first), tie-broken by insertion
/// sequence ascending (FIFO among equal priorities).
struct QueuedJob {
    sequence: u64,
    job: Job,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.job.priority == other.job.priority && self.sequence == other.sequence
    }
}
impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.job
            .priority
            .cmp(&other.job.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct Inner {
    heap: BinaryHeap<QueuedJob>,
    queued_or_running: HashSet<JobId>,
    next_sequence: u64,
}

/// Priority queue of due jobs (§4.C10). Enqueue is idempotent per job id:
/// a job already queued or running is dropped silently. Dequeue blocks
/// until a job is available via [`Notify`]; the caller is responsible for
/// marking a job no-longer-running once its worker finishes.
pub struct JobQueue {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                queued_or_running: HashSet::new(),
                next_sequence: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Enqueue `job` if it isn't already queued or marked running.
    pub async fn enqueue(&self, job: Job) {
        let mut inner = self.inner.lock().await;
        if !inner.queued_or_running.insert(job.id) {
            return;
        }
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.heap.push(QueuedJob { sequence, job });
        drop(inner);
        self.notify.notify_one();
    }

    /// Pop the highest-priority job, waiting for one to become available.
    /// The job remains marked "queued or running" until [`Self::finish`] is
    /// called.
    pub async fn dequeue(&self) -> Job {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(queued) = inner.heap.pop() {
                    return queued.job;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Release `job_id`'s "queued or running" mark so a future producer
    /// tick may enqueue it again.
    pub async fn finish(&self, job_id: JobId) {
        let mut inner = self.inner.lock().await;
        inner.queued_or_running.remove(&job_id);
    }

    pub async fn is_queued_or_running(&self, job_id: JobId) -> bool {
        self.inner.lock().await.queued_or_running.contains(&job_id)
    }

    /// Drain all pending (not yet dequeued) jobs, e.g. on shutdown.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.heap.clear();
        inner.queued_or_running.clear();
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reef_types::ProfileId;

    fn job(priority: i32) -> Job {
        Job {
            id: JobId::new(),
            name: "j".into(),
            profile_ids: vec![ProfileId::new()],
            priority,
            allow_concurrent: false,
            timeout_minutes: 30,
            max_retries: 3,
            consecutive_failures: 0,
            next_run_time: Utc::now(),
            is_enabled: true,
        }
    }

    #[tokio::test]
    async fn higher_priority_dequeues_first() {
        let queue = JobQueue::new();
        let low = job(1);
        let high = job(9);
        queue.enqueue(low.clone()).await;
        queue.enqueue(high.clone()).await;

        let first = queue.dequeue().await;
        assert_eq!(first.id, high.id);
    }

    #[tokio::test]
    async fn equal_priority_is_fifo() {
        let queue = JobQueue::new();
        let first = job(5);
        let second = job(5);
        queue.enqueue(first.clone()).await;
        queue.enqueue(second.clone()).await;

        assert_eq!(queue.dequeue().await.id, first.id);
        queue.finish(first.id).await;
        assert_eq!(queue.dequeue().await.id, second.id);
    }

    #[tokio::test]
    async fn duplicate_enqueue_is_dropped_while_queued() {
        let queue = JobQueue::new();
        let j = job(5);
        queue.enqueue(j.clone()).await;
        queue.enqueue(j.clone()).await;

        let _ = queue.dequeue().await;
        assert!(queue.is_queued_or_running(j.id).await);
        queue.finish(j.id).await;
        assert!(!queue.is_queued_or_running(j.id).await);
    }
}
