//! Task queue for deferred sends.
//!
//! `Mailer::enqueue` turns a send request into an [`EmailJob`] and hands it
//! to a [`TaskQueue`]. A [`QueueWorker`] pops due jobs, runs them through
//! `Mailer::send`, retries retryable failures with exponential backoff and
//! moves the rest to a dead letter list.

mod backend;
mod backoff;
mod factory;
mod memory_backend;
mod worker;

pub use backend::{DeadLetter, EmailJob, QueueError, QueueStats, TaskQueue};
pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use factory::create_task_queue;
pub use memory_backend::MemoryQueueBackend;
pub use worker::{JobOutcome, QueueWorker, WorkerConfig};

/// Configuration for a queue backend
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Whether the queue accepts jobs
    pub enabled: bool,
    /// Maximum number of pending jobs
    pub max_size: usize,
    /// Dead letters kept before the oldest are discarded
    pub dead_letter_max: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_size: 10_000,
            dead_letter_max: 1_000,
        }
    }
}
