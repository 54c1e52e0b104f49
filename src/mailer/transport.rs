//! Transport abstraction and in-process transports.
//!
//! Real delivery (SMTP, HTTP providers) lives outside this crate behind the
//! [`Transport`] trait. The transports here keep messages in memory or write
//! them to the log, for development and tests.

use parking_lot::Mutex;
use thiserror::Error;

use super::message::RenderedMessage;

/// Transmission failure
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Message rejected: {0}")]
    Rejected(String),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Delivers rendered messages.
///
/// Implementations must be thread-safe (`Send + Sync`) since a mailer is
/// shared between callers and queue workers.
pub trait Transport: Send + Sync {
    /// Transmit one message and return how many messages were delivered
    fn transmit(&self, message: &RenderedMessage) -> Result<usize, TransportError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Keeps every transmitted message in an outbox
#[derive(Debug, Default)]
pub struct MemoryTransport {
    outbox: Mutex<Vec<RenderedMessage>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all messages sent so far
    pub fn outbox(&self) -> Vec<RenderedMessage> {
        self.outbox.lock().clone()
    }

    /// Number of messages sent so far
    pub fn len(&self) -> usize {
        self.outbox.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.lock().is_empty()
    }

    /// Remove and return all messages
    pub fn take(&self) -> Vec<RenderedMessage> {
        std::mem::take(&mut *self.outbox.lock())
    }
}

impl Transport for MemoryTransport {
    fn transmit(&self, message: &RenderedMessage) -> Result<usize, TransportError> {
        self.outbox.lock().push(message.clone());
        Ok(1)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport {
    /// Include bodies and alternatives in the log record
    pub full: bool,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full() -> Self {
        Self { full: true }
    }
}

impl Transport for LogTransport {
    fn transmit(&self, message: &RenderedMessage) -> Result<usize, TransportError> {
        let recipients: Vec<&String> = message.recipients().collect();

        if self.full {
            tracing::info!(
                from = ?message.from,
                to = ?recipients,
                subject = %message.subject,
                body = %message.body,
                alternatives = ?message.alternatives,
                attachments = message.attachments.len(),
                "Email logged"
            );
        } else {
            tracing::info!(
                from = ?message.from,
                to = ?recipients,
                subject = %message.subject,
                "Email logged"
            );
        }

        Ok(1)
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
