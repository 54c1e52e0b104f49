//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    EMAILS_SENT_TOTAL, MESSAGES_DELIVERED_TOTAL, QUEUE_COMPLETED_TOTAL, QUEUE_DEAD_LETTERED_TOTAL,
    QUEUE_DEPTH, QUEUE_ENQUEUED_TOTAL, QUEUE_REJECTED_TOTAL, QUEUE_RETRIED_TOTAL,
    RENDER_DURATION, SEND_FAILURES_TOTAL, TRANSPORT_ERRORS_SUPPRESSED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording send pipeline metrics
pub struct SendMetrics;

impl SendMetrics {
    /// Record an email handed to the transport
    pub fn record_sent(template: &str, delivered: usize) {
        EMAILS_SENT_TOTAL.with_label_values(&[template]).inc();
        MESSAGES_DELIVERED_TOTAL.inc_by(delivered as u64);
    }

    /// Record a send aborted at `stage`
    pub fn record_failure(stage: &str) {
        SEND_FAILURES_TOTAL.with_label_values(&[stage]).inc();
    }

    /// Record a transport error swallowed by `fail_silently`
    pub fn record_suppressed() {
        TRANSPORT_ERRORS_SUPPRESSED_TOTAL.inc();
    }

    pub fn record_render_duration(duration: Duration) {
        RENDER_DURATION.observe(duration.as_secs_f64());
    }
}

/// Helper struct for recording task queue metrics
pub struct QueueMetrics;

impl QueueMetrics {
    pub fn record_enqueued() {
        QUEUE_ENQUEUED_TOTAL.inc();
    }

    pub fn record_rejected() {
        QUEUE_REJECTED_TOTAL.inc();
    }

    pub fn record_retried() {
        QUEUE_RETRIED_TOTAL.inc();
    }

    pub fn record_dead_lettered() {
        QUEUE_DEAD_LETTERED_TOTAL.inc();
    }

    pub fn record_completed() {
        QUEUE_COMPLETED_TOTAL.inc();
    }

    pub fn set_depth(depth: usize) {
        QUEUE_DEPTH.set(depth as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_metrics() {
        SendMetrics::record_sent("welcome", 1);
        SendMetrics::record_failure("transport");
        SendMetrics::record_suppressed();
        SendMetrics::record_render_duration(Duration::from_micros(250));
        // Just verify no panics
    }

    #[test]
    fn test_queue_metrics() {
        QueueMetrics::record_enqueued();
        QueueMetrics::record_rejected();
        QueueMetrics::record_retried();
        QueueMetrics::record_dead_lettered();
        QueueMetrics::record_completed();
        QueueMetrics::set_depth(0);
        // Just verify no panics
    }
}
