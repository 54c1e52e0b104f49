//! Task queue abstraction for deferred sends.
//!
//! This module defines the `TaskQueue` trait that queue backends implement
//! and the `EmailJob` payload they carry.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::mailer::SendOptions;
use crate::template::{RenderContext, TemplateId};

/// Errors that can occur during queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is disabled")]
    Disabled,

    #[error("Queue is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("Queue backend error: {0}")]
    Backend(String),
}

/// A send request waiting in the queue.
///
/// The context has already been converted to JSON, so a job is
/// self-contained and can be persisted or moved between processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailJob {
    /// Unique job ID
    pub id: Uuid,
    pub template: TemplateId,
    pub context: RenderContext,
    #[serde(default)]
    pub options: SendOptions,
    /// When the job was first enqueued
    pub enqueued_at: DateTime<Utc>,
    /// Earliest time the job may run
    pub available_at: DateTime<Utc>,
    /// Number of send attempts made so far
    #[serde(default)]
    pub attempts: u32,
    /// Error from the most recent attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl EmailJob {
    /// Create a job that is due immediately
    pub fn new(template: TemplateId, context: RenderContext, options: SendOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            template,
            context,
            options,
            enqueued_at: now,
            available_at: now,
            attempts: 0,
            last_error: None,
        }
    }

    /// Check if the job may run at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.available_at <= now
    }

    /// Record a failed attempt and push the job back by `delay`
    pub fn schedule_retry(&mut self, delay: Duration, error: impl Into<String>) {
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
        self.available_at = Utc::now()
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.last_error = Some(error.into());
    }
}

/// A job that will not be attempted again
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub job: EmailJob,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(job: EmailJob, reason: impl Into<String>) -> Self {
        Self {
            job,
            reason: reason.into(),
            failed_at: Utc::now(),
        }
    }
}

/// Statistics from a queue backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Jobs waiting, due or not
    pub pending: usize,
    /// Jobs waiting whose time has come
    pub due: usize,
    /// Jobs in the dead letter list
    pub dead_lettered: usize,
    /// Maximum number of pending jobs accepted by `push`
    pub capacity: usize,
}

/// Trait for task queue backends.
///
/// Implementations must be thread-safe (`Send + Sync`) as they're shared
/// between the mailer and its workers.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Check if the queue accepts jobs
    fn is_enabled(&self) -> bool;

    /// Backend name used in logs
    fn name(&self) -> &'static str;

    /// Add a new job.
    ///
    /// Returns `QueueError::Full` when the queue is at capacity.
    async fn push(&self, job: EmailJob) -> Result<(), QueueError>;

    /// Remove and return the oldest job that is due, if any
    async fn pop(&self) -> Result<Option<EmailJob>, QueueError>;

    /// Return a previously popped job to the queue.
    ///
    /// Capacity is not enforced here, since the job was already accepted.
    async fn requeue(&self, job: EmailJob) -> Result<(), QueueError>;

    /// Move a popped job to the dead letter list
    async fn dead_letter(&self, job: EmailJob, reason: String) -> Result<(), QueueError>;

    /// Get the dead letter list, oldest first
    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, QueueError>;

    /// Number of pending jobs
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Get queue statistics
    async fn stats(&self) -> QueueStats;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> RenderContext {
        json!({"name": "Ada", "tags": ["a", "b"]})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_new_job_is_due() {
        let job = EmailJob::new(TemplateId::new("welcome"), context(), SendOptions::default());
        assert_eq!(job.attempts, 0);
        assert!(job.is_due(Utc::now()));
        assert!(job.last_error.is_none());
    }

    #[test]
    fn test_schedule_retry_delays_job() {
        let mut job = EmailJob::new(TemplateId::new("welcome"), context(), SendOptions::default());
        job.schedule_retry(Duration::from_secs(60), "smtp down");

        assert!(!job.is_due(Utc::now()));
        assert!(job.is_due(Utc::now() + chrono::Duration::seconds(61)));
        assert_eq!(job.last_error.as_deref(), Some("smtp down"));
    }

    #[test]
    fn test_job_json_payload() {
        let job = EmailJob::new(
            TemplateId::new("welcome"),
            context(),
            SendOptions::default().fail_silently(true),
        );

        let payload = serde_json::to_value(&job).unwrap();
        assert_eq!(payload["template"], "welcome");
        assert_eq!(payload["context"]["tags"][1], "b");
        assert_eq!(payload["options"]["fail_silently"], true);
        assert!(payload.get("last_error").is_none());

        let decoded: EmailJob = serde_json::from_value(payload).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn test_queue_error_display() {
        assert_eq!(
            QueueError::Full { capacity: 10 }.to_string(),
            "Queue is full (capacity 10)"
        );
        assert_eq!(QueueError::Disabled.to_string(), "Queue is disabled");
    }
}
