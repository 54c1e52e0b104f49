//! Enqueue and worker integration tests
//!
//! These tests verify the deferred send path: `Mailer::enqueue` builds a
//! self-contained job, and a `QueueWorker` runs it through `Mailer::send`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;

use mailing::config::QueueConfig as SettingsQueueConfig;
use mailing::error::MailError;
use mailing::mailer::{
    Mailer, MemoryTransport, MergeOverride, RenderedMessage, SendOptions, Transport,
    TransportError,
};
use mailing::queue::{
    create_task_queue, BackoffConfig, JobOutcome, QueueError, QueueWorker, TaskQueue,
    WorkerConfig,
};
use mailing::template::{MessageTemplate, PlaceholderTemplate, TemplateId};

#[derive(Serialize)]
struct InvoiceEmail {
    order_id: u64,
}

struct AlwaysDown {
    attempts: AtomicUsize,
}

impl Transport for AlwaysDown {
    fn transmit(&self, _message: &RenderedMessage) -> Result<usize, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Unavailable("smtp down".to_string()))
    }

    fn name(&self) -> &'static str {
        "always-down"
    }
}

fn queue_settings(max_size: usize) -> SettingsQueueConfig {
    SettingsQueueConfig {
        enabled: true,
        max_size,
        ..Default::default()
    }
}

fn fast_worker_config(max_attempts: u32) -> WorkerConfig {
    WorkerConfig {
        poll_interval: Duration::from_millis(5),
        max_attempts,
        retry: BackoffConfig {
            initial_delay_ms: 1,
            max_delay_ms: 2,
            multiplier: 2.0,
            jitter_factor: 0.0,
        },
    }
}

fn invoice_template() -> MessageTemplate {
    MessageTemplate::builder()
        .to("billing@example.com")
        .subject(PlaceholderTemplate::new("Invoice for order {{ order_id }}"))
        .build()
}

fn create_mailer(transport: Arc<dyn Transport>, queue: Arc<dyn TaskQueue>) -> (Arc<Mailer>, TemplateId) {
    let mailer = Mailer::new(transport).with_queue(queue);
    let id = TemplateId::new("invoice");
    mailer.register(id.clone(), invoice_template());
    (Arc::new(mailer), id)
}

#[tokio::test]
async fn test_enqueue_without_queue_is_disabled() {
    let mailer = Mailer::new(Arc::new(MemoryTransport::new()));
    let id = TemplateId::new("invoice");
    mailer.register(id.clone(), invoice_template());

    let result = mailer
        .enqueue(&id, &InvoiceEmail { order_id: 123 }, SendOptions::default())
        .await;

    assert!(matches!(result, Err(MailError::Queue(QueueError::Disabled))));
}

#[tokio::test]
async fn test_enqueue_with_disabled_queue() {
    let queue = create_task_queue(&SettingsQueueConfig::default());
    let (mailer, id) = create_mailer(Arc::new(MemoryTransport::new()), queue);

    let result = mailer
        .enqueue(&id, &InvoiceEmail { order_id: 123 }, SendOptions::default())
        .await;

    assert!(matches!(result, Err(MailError::Queue(QueueError::Disabled))));
}

#[tokio::test]
async fn test_enqueue_validates_before_handoff() {
    let queue = create_task_queue(&queue_settings(10));
    let (mailer, id) = create_mailer(Arc::new(MemoryTransport::new()), queue.clone());

    let unknown = mailer
        .enqueue(&TemplateId::new("unknown"), &json!({}), SendOptions::default())
        .await;
    assert!(matches!(unknown, Err(MailError::TemplateNotFound(_))));

    let scalar = mailer.enqueue(&id, &42, SendOptions::default()).await;
    assert!(matches!(scalar, Err(MailError::Serialization(_))));

    let mut tuple_keys = HashMap::new();
    tuple_keys.insert((1, 2), "not representable");
    let unserializable = mailer.enqueue(&id, &tuple_keys, SendOptions::default()).await;
    assert!(matches!(unserializable, Err(MailError::Serialization(_))));

    assert!(queue.is_empty().await);
    assert_eq!(mailer.stats().total_enqueued, 0);
}

#[tokio::test]
async fn test_enqueue_rejects_when_full() {
    let queue = create_task_queue(&queue_settings(1));
    let (mailer, id) = create_mailer(Arc::new(MemoryTransport::new()), queue.clone());

    mailer
        .enqueue(&id, &InvoiceEmail { order_id: 1 }, SendOptions::default())
        .await
        .unwrap();
    let result = mailer
        .enqueue(&id, &InvoiceEmail { order_id: 2 }, SendOptions::default())
        .await;

    assert!(matches!(
        result,
        Err(MailError::Queue(QueueError::Full { capacity: 1 }))
    ));
    assert_eq!(queue.len().await, 1);
}

#[tokio::test]
async fn test_worker_delivers_enqueued_job() {
    let transport = Arc::new(MemoryTransport::new());
    let queue = create_task_queue(&queue_settings(10));
    let (mailer, id) = create_mailer(transport.clone(), queue.clone());

    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let worker = QueueWorker::new(mailer.clone(), queue.clone(), fast_worker_config(3), shutdown_rx);

    let job_id = mailer
        .enqueue(
            &id,
            &InvoiceEmail { order_id: 123 },
            SendOptions::new().merge(MergeOverride::new().to("customer@example.com")),
        )
        .await
        .unwrap();

    let outcome = worker.process_next().await.unwrap();
    assert_eq!(
        outcome,
        Some(JobOutcome::Sent {
            job_id,
            sent_count: 1
        })
    );

    let sent = transport.take();
    assert_eq!(sent[0].subject, "Invoice for order 123");
    assert!(sent[0].to.contains("customer@example.com"));
    assert!(sent[0].to.contains("billing@example.com"));
}

#[tokio::test]
async fn test_persistent_failure_is_dead_lettered() {
    let transport = Arc::new(AlwaysDown {
        attempts: AtomicUsize::new(0),
    });
    let queue = create_task_queue(&queue_settings(10));
    let (mailer, id) = create_mailer(transport.clone(), queue.clone());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = QueueWorker::new(mailer.clone(), queue.clone(), fast_worker_config(3), shutdown_rx).spawn();

    let job_id = mailer
        .enqueue(&id, &InvoiceEmail { order_id: 7 }, SendOptions::default())
        .await
        .unwrap();

    let dead = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let dead = queue.dead_letters().await.unwrap();
            if !dead.is_empty() {
                return dead;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].job.id, job_id);
    assert_eq!(dead[0].job.attempts, 3);
    assert!(dead[0].reason.contains("smtp down"));
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_fail_silently_job_completes() {
    let transport = Arc::new(AlwaysDown {
        attempts: AtomicUsize::new(0),
    });
    let queue = create_task_queue(&queue_settings(10));
    let (mailer, id) = create_mailer(transport.clone(), queue.clone());

    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let worker = QueueWorker::new(mailer.clone(), queue.clone(), fast_worker_config(3), shutdown_rx);

    mailer
        .enqueue(
            &id,
            &InvoiceEmail { order_id: 9 },
            SendOptions::new().fail_silently(true),
        )
        .await
        .unwrap();

    let outcome = worker.process_next().await.unwrap();
    assert!(matches!(outcome, Some(JobOutcome::Sent { sent_count: 0, .. })));
    assert!(queue.dead_letters().await.unwrap().is_empty());
}
