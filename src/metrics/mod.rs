//! Prometheus metrics for the mailer.
//!
//! This module provides metrics for monitoring message dispatch:
//! - Send metrics (emails sent per template, delivered, failures by stage)
//! - Render latency
//! - Task queue metrics (enqueued, retried, dead-lettered, depth)

mod helpers;

pub use helpers::{encode_metrics, QueueMetrics, SendMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "mailing";

lazy_static! {
    // ============================================================================
    // Send Metrics
    // ============================================================================

    /// Emails handed to the transport, by template
    pub static ref EMAILS_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_emails_sent_total", METRIC_PREFIX),
        "Total emails handed to the transport",
        &["template"]
    ).unwrap();

    /// Messages the transport reported as delivered
    pub static ref MESSAGES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_delivered_total", METRIC_PREFIX),
        "Total messages reported delivered by the transport"
    ).unwrap();

    /// Failed sends by pipeline stage
    pub static ref SEND_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_send_failures_total", METRIC_PREFIX),
        "Total failed sends by pipeline stage",
        &["stage"]
    ).unwrap();

    /// Transport errors swallowed because the caller asked to fail silently
    pub static ref TRANSPORT_ERRORS_SUPPRESSED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_transport_errors_suppressed_total", METRIC_PREFIX),
        "Total transport errors suppressed by fail_silently"
    ).unwrap();

    /// Time spent rendering a template
    pub static ref RENDER_DURATION: Histogram = register_histogram!(
        format!("{}_render_duration_seconds", METRIC_PREFIX),
        "Template render duration in seconds",
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]
    ).unwrap();

    // ============================================================================
    // Queue Metrics
    // ============================================================================

    /// Jobs accepted by the task queue
    pub static ref QUEUE_ENQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_enqueued_total", METRIC_PREFIX),
        "Total jobs enqueued for asynchronous sending"
    ).unwrap();

    /// Jobs rejected because the queue was full
    pub static ref QUEUE_REJECTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_rejected_total", METRIC_PREFIX),
        "Total jobs rejected because the queue was full"
    ).unwrap();

    /// Jobs scheduled for another attempt
    pub static ref QUEUE_RETRIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_retried_total", METRIC_PREFIX),
        "Total job retries"
    ).unwrap();

    /// Jobs abandoned after failing
    pub static ref QUEUE_DEAD_LETTERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_dead_lettered_total", METRIC_PREFIX),
        "Total jobs moved to the dead letter list"
    ).unwrap();

    /// Jobs completed by a worker
    pub static ref QUEUE_COMPLETED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_completed_total", METRIC_PREFIX),
        "Total jobs completed by workers"
    ).unwrap();

    /// Jobs currently waiting in the queue
    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        format!("{}_queue_depth", METRIC_PREFIX),
        "Jobs currently waiting in the queue"
    ).unwrap();
}
