use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::QueueConfig as SettingsQueueConfig;
use crate::error::MailError;
use crate::mailer::Mailer;
use crate::metrics::QueueMetrics;

use super::backend::{EmailJob, QueueError, TaskQueue};
use super::backoff::{BackoffConfig, ExponentialBackoff};

/// Worker behaviour
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep when no job is due
    pub poll_interval: Duration,
    /// Attempts per job before it is dead-lettered
    pub max_attempts: u32,
    /// Delay between attempts of a failing job
    pub retry: BackoffConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_attempts: 5,
            retry: BackoffConfig::default(),
        }
    }
}

impl From<&SettingsQueueConfig> for WorkerConfig {
    fn from(settings: &SettingsQueueConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            max_attempts: settings.max_attempts.max(1),
            retry: BackoffConfig {
                initial_delay_ms: settings.retry_initial_delay_ms,
                max_delay_ms: settings.retry_max_delay_ms,
                ..BackoffConfig::default()
            },
        }
    }
}

/// What happened to a popped job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Sent {
        job_id: Uuid,
        sent_count: usize,
    },
    Retried {
        job_id: Uuid,
        attempt: u32,
        delay: Duration,
    },
    DeadLettered {
        job_id: Uuid,
        reason: String,
    },
}

/// Background task that drains a task queue through `Mailer::send`.
///
/// Delivery is at-least-once: a job leaves the queue only after it was sent
/// or dead-lettered. Sends run on the blocking thread pool.
pub struct QueueWorker {
    mailer: Arc<Mailer>,
    queue: Arc<dyn TaskQueue>,
    config: WorkerConfig,
    shutdown: broadcast::Receiver<()>,
}

impl QueueWorker {
    pub fn new(
        mailer: Arc<Mailer>,
        queue: Arc<dyn TaskQueue>,
        config: WorkerConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            mailer,
            queue,
            config,
            shutdown,
        }
    }

    /// Spawn the worker on the tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process jobs until shutdown is signalled.
    ///
    /// The shutdown signal is checked between jobs, so a job that has been
    /// popped always finishes.
    pub async fn run(mut self) {
        let mut error_backoff = ExponentialBackoff::with_config(self.config.retry.clone());

        tracing::info!(
            queue = self.queue.name(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "Queue worker started"
        );

        loop {
            let idle = match self.process_next().await {
                Ok(Some(_)) => {
                    error_backoff.reset();
                    None
                }
                Ok(None) => Some(self.config.poll_interval),
                Err(e) => {
                    let delay = error_backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Queue backend error, backing off"
                    );
                    Some(delay)
                }
            };

            match idle {
                None => match self.shutdown.try_recv() {
                    Err(TryRecvError::Empty) => continue,
                    _ => {
                        tracing::info!("Queue worker received shutdown signal");
                        break;
                    }
                },
                Some(delay) => {
                    tokio::select! {
                        _ = self.shutdown.recv() => {
                            tracing::info!("Queue worker received shutdown signal");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!("Queue worker stopped");
    }

    /// Pop one due job and run it.
    ///
    /// Returns `Ok(None)` when no job is due.
    #[tracing::instrument(name = "queue_worker.process", skip(self))]
    pub async fn process_next(&self) -> Result<Option<JobOutcome>, QueueError> {
        let Some(mut job) = self.queue.pop().await? else {
            return Ok(None);
        };

        job.attempts += 1;

        let outcome = match self.execute(&job).await {
            Ok(sent_count) => {
                QueueMetrics::record_completed();
                tracing::info!(
                    job_id = %job.id,
                    template = %job.template,
                    attempts = job.attempts,
                    sent_count = sent_count,
                    "Queued email sent"
                );
                JobOutcome::Sent {
                    job_id: job.id,
                    sent_count,
                }
            }
            Err(e) if e.is_retryable() && job.attempts < self.config.max_attempts => {
                let delay = self.config.retry.delay_for_attempt(job.attempts);
                tracing::warn!(
                    job_id = %job.id,
                    template = %job.template,
                    attempt = job.attempts,
                    max_attempts = self.config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Queued email failed, will retry"
                );

                let (job_id, attempt) = (job.id, job.attempts);
                job.schedule_retry(delay, e.to_string());
                self.queue.requeue(job).await?;
                QueueMetrics::record_retried();

                JobOutcome::Retried {
                    job_id,
                    attempt,
                    delay,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(
                    job_id = %job.id,
                    template = %job.template,
                    attempts = job.attempts,
                    code = e.code(),
                    error = %e,
                    "Queued email abandoned"
                );

                let job_id = job.id;
                job.last_error = Some(reason.clone());
                self.queue.dead_letter(job, reason.clone()).await?;
                QueueMetrics::record_dead_lettered();

                JobOutcome::DeadLettered { job_id, reason }
            }
        };

        QueueMetrics::set_depth(self.queue.len().await);

        Ok(Some(outcome))
    }

    async fn execute(&self, job: &EmailJob) -> Result<usize, MailError> {
        let mailer = Arc::clone(&self.mailer);
        let template = job.template.clone();
        let context = job.context.clone();
        let options = job.options.clone();

        tokio::task::spawn_blocking(move || mailer.send(&template, &context, options))
            .await
            .unwrap_or_else(|e| {
                Err(MailError::Queue(QueueError::Backend(format!(
                    "send task failed: {e}"
                ))))
            })
    }
}
