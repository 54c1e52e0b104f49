//! Queue backend factory

use std::sync::Arc;

use crate::config::QueueConfig as SettingsQueueConfig;

use super::backend::TaskQueue;
use super::memory_backend::MemoryQueueBackend;
use super::QueueConfig;

/// Create a task queue based on configuration.
///
/// Only the `"memory"` backend ships with this crate; unknown backend names
/// fall back to it with a warning. A disabled queue is still returned so
/// that `enqueue` can report `QueueError::Disabled`.
///
/// # Example
///
/// ```rust,ignore
/// let queue = create_task_queue(&settings.queue);
/// let mailer = Mailer::new(transport).with_queue(queue.clone());
/// ```
pub fn create_task_queue(settings: &SettingsQueueConfig) -> Arc<dyn TaskQueue> {
    let config = QueueConfig {
        enabled: settings.enabled,
        max_size: settings.max_size,
        dead_letter_max: settings.dead_letter_max,
    };

    match settings.backend.as_str() {
        "memory" => {}
        other => {
            tracing::warn!(
                backend = %other,
                "Unknown queue backend, falling back to memory"
            );
        }
    }

    tracing::info!(
        backend = "memory",
        enabled = config.enabled,
        max_size = config.max_size,
        dead_letter_max = config.dead_letter_max,
        "Creating memory task queue"
    );

    Arc::new(MemoryQueueBackend::new(config))
}
