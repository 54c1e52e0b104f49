//! In-memory task queue backend.
//!
//! Jobs are stored in memory and will be lost on restart. The dead letter
//! list is bounded by `dead_letter_max`; the oldest entries are dropped.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::backend::{DeadLetter, EmailJob, QueueError, QueueStats, TaskQueue};
use super::QueueConfig;

/// In-memory task queue backend.
///
/// Pending jobs live in a `VecDeque` in enqueue order; `pop` returns the
/// first one that is due, so a job waiting on a retry delay does not block
/// the jobs behind it.
pub struct MemoryQueueBackend {
    pending: Mutex<VecDeque<EmailJob>>,
    dead: Mutex<VecDeque<DeadLetter>>,
    config: QueueConfig,
}

impl MemoryQueueBackend {
    /// Create a new memory queue backend with the given configuration.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            dead: Mutex::new(VecDeque::new()),
            config,
        }
    }
}

impl Default for MemoryQueueBackend {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

#[async_trait]
impl TaskQueue for MemoryQueueBackend {
    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn push(&self, job: EmailJob) -> Result<(), QueueError> {
        if !self.config.enabled {
            return Err(QueueError::Disabled);
        }

        let mut pending = self.pending.lock();

        if pending.len() >= self.config.max_size {
            tracing::debug!(
                job_id = %job.id,
                capacity = self.config.max_size,
                "Rejected job, queue is full"
            );
            return Err(QueueError::Full {
                capacity: self.config.max_size,
            });
        }

        pending.push_back(job);

        Ok(())
    }

    async fn pop(&self) -> Result<Option<EmailJob>, QueueError> {
        let now = Utc::now();
        let mut pending = self.pending.lock();

        let job = pending
            .iter()
            .position(|job| job.is_due(now))
            .and_then(|index| pending.remove(index));

        Ok(job)
    }

    async fn requeue(&self, job: EmailJob) -> Result<(), QueueError> {
        tracing::debug!(
            job_id = %job.id,
            attempts = job.attempts,
            available_at = %job.available_at,
            "Job requeued"
        );
        self.pending.lock().push_back(job);
        Ok(())
    }

    async fn dead_letter(&self, job: EmailJob, reason: String) -> Result<(), QueueError> {
        tracing::debug!(job_id = %job.id, reason = %reason, "Job dead-lettered");

        let mut dead = self.dead.lock();
        dead.push_back(DeadLetter::new(job, reason));
        while dead.len() > self.config.dead_letter_max {
            if let Some(dropped) = dead.pop_front() {
                tracing::debug!(
                    job_id = %dropped.job.id,
                    limit = self.config.dead_letter_max,
                    "Discarded oldest dead letter"
                );
            }
        }

        Ok(())
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, QueueError> {
        Ok(self.dead.lock().iter().cloned().collect())
    }

    async fn len(&self) -> usize {
        self.pending.lock().len()
    }

    async fn stats(&self) -> QueueStats {
        let now = Utc::now();
        let (pending, due) = {
            let pending = self.pending.lock();
            (pending.len(), pending.iter().filter(|job| job.is_due(now)).count())
        };

        QueueStats {
            pending,
            due,
            dead_lettered: self.dead.lock().len(),
            capacity: self.config.max_size,
        }
    }
}
