use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::config::MailerConfig;
use crate::error::{MailError, Result};
use crate::metrics::{QueueMetrics, SendMetrics};
use crate::queue::{EmailJob, QueueError, TaskQueue};
use crate::template::{MessageTemplate, RenderContext, TemplateId, TemplateRegistry};

use super::hooks::{AfterSend, BeforeRender, BeforeSend, HookBus, HookStage};
use super::html::{HtmlTransform, Passthrough, StyleInliner};
use super::merge::merge_message;
use super::message::SendOptions;
use super::renderer::Renderer;
use super::transport::Transport;

/// Statistics for the mailer
#[derive(Debug, Default)]
pub struct MailerStats {
    /// Messages handed to the transport
    pub total_sent: AtomicU64,
    /// Delivered count reported by the transport
    pub total_delivered: AtomicU64,
    /// Sends that returned an error
    pub total_failed: AtomicU64,
    /// Transport errors swallowed by `fail_silently`
    pub total_suppressed: AtomicU64,
    /// Jobs handed to the task queue
    pub total_enqueued: AtomicU64,
}

impl MailerStats {
    pub fn snapshot(&self) -> MailerStatsSnapshot {
        MailerStatsSnapshot {
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_suppressed: self.total_suppressed.load(Ordering::Relaxed),
            total_enqueued: self.total_enqueued.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of mailer statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailerStatsSnapshot {
    pub total_sent: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub total_suppressed: u64,
    pub total_enqueued: u64,
}

/// Renders registered templates and hands them to a transport.
///
/// Every send runs the same fixed pipeline: lookup, `before_render`, render,
/// merge, `before_send`, transmit, `after_send`. Hooks are connected while
/// the mailer is still exclusively owned, before it is shared.
pub struct Mailer {
    registry: Arc<TemplateRegistry>,
    renderer: Renderer,
    transport: Arc<dyn Transport>,
    hooks: HookBus,
    queue_backend: Option<Arc<dyn TaskQueue>>,
    fail_silently: bool,
    stats: MailerStats,
}

impl Mailer {
    /// Create a mailer with its own empty registry
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_registry(Arc::new(TemplateRegistry::new()), transport)
    }

    /// Create a mailer over a shared registry
    pub fn with_registry(registry: Arc<TemplateRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            renderer: Renderer::default(),
            transport,
            hooks: HookBus::new(),
            queue_backend: None,
            fail_silently: false,
            stats: MailerStats::default(),
        }
    }

    /// Create a mailer from configuration
    pub fn from_config(
        config: &MailerConfig,
        registry: Arc<TemplateRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let html_transform: Arc<dyn HtmlTransform> = if config.inline_css {
            Arc::new(StyleInliner)
        } else {
            Arc::new(Passthrough)
        };

        let mut mailer = Self::with_registry(registry, transport)
            .with_renderer(Renderer::new(html_transform).with_default_from(config.default_from.clone()));
        mailer.fail_silently = config.fail_silently;
        mailer
    }

    /// Replace the renderer
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Attach a task queue for `enqueue`
    pub fn with_queue(mut self, queue_backend: Arc<dyn TaskQueue>) -> Self {
        self.queue_backend = Some(queue_backend);
        self
    }

    /// Hook subscribers, for connecting during startup
    pub fn hooks_mut(&mut self) -> &mut HookBus {
        &mut self.hooks
    }

    /// Get mailer statistics
    pub fn stats(&self) -> MailerStatsSnapshot {
        self.stats.snapshot()
    }

    /// Send options carrying the configured defaults
    pub fn send_options(&self) -> SendOptions {
        SendOptions::new().fail_silently(self.fail_silently)
    }

    /// Register a template that can later be sent by its id
    pub fn register(&self, id: TemplateId, template: MessageTemplate) -> Arc<MessageTemplate> {
        self.registry.register(id, template)
    }

    /// Get the template registered under `id`
    pub fn get_template(&self, id: &TemplateId) -> Option<Arc<MessageTemplate>> {
        self.registry.lookup(id)
    }

    /// Render the template registered under `id` and transmit it.
    ///
    /// Returns the number of delivered messages reported by the transport,
    /// or `0` for a transport failure when `options.fail_silently` is set.
    #[tracing::instrument(
        name = "mailer.send",
        skip(self, id, context, options),
        fields(template = %id, fail_silently = options.fail_silently)
    )]
    pub fn send(&self, id: &TemplateId, context: &RenderContext, options: SendOptions) -> Result<usize> {
        let result = self.run_pipeline(id, context, &options);

        if let Err(ref e) = result {
            self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
            SendMetrics::record_failure(failure_stage(e));
            tracing::debug!(template = %id, error = %e, code = e.code(), "Send failed");
        }

        result
    }

    fn run_pipeline(
        &self,
        id: &TemplateId,
        context: &RenderContext,
        options: &SendOptions,
    ) -> Result<usize> {
        let template = self
            .registry
            .lookup(id)
            .ok_or_else(|| MailError::TemplateNotFound(id.clone()))?;

        self.hooks
            .fire_before_render(&BeforeRender {
                sender: id,
                mailer: self,
                template_name: id,
                email_template: &template,
                context,
            })
            .map_err(|source| MailError::Hook {
                stage: HookStage::BeforeRender,
                source,
            })?;

        let started = Instant::now();
        let rendered = self.renderer.render(&template, context)?;
        SendMetrics::record_render_duration(started.elapsed());

        let email = merge_message(rendered, options.merge.as_ref());

        tracing::debug!(
            template = %id,
            recipients = email.recipients().count(),
            alternatives = email.alternatives.len(),
            "Rendered email"
        );

        self.hooks
            .fire_before_send(&BeforeSend {
                sender: id,
                mailer: self,
                template_name: id,
                email: &email,
                context,
            })
            .map_err(|source| MailError::Hook {
                stage: HookStage::BeforeSend,
                source,
            })?;

        let sent_count = match self.transport.transmit(&email) {
            Ok(count) => count,
            Err(e) if options.fail_silently => {
                tracing::warn!(
                    template = %id,
                    transport = self.transport.name(),
                    error = %e,
                    "Transport failed, suppressed by fail_silently"
                );
                self.stats.total_suppressed.fetch_add(1, Ordering::Relaxed);
                SendMetrics::record_suppressed();
                0
            }
            Err(e) => return Err(e.into()),
        };

        // Update stats
        self.stats.total_sent.fetch_add(1, Ordering::Relaxed);
        self.stats
            .total_delivered
            .fetch_add(sent_count as u64, Ordering::Relaxed);
        SendMetrics::record_sent(id.as_str(), sent_count);

        self.hooks
            .fire_after_send(&AfterSend {
                sender: id,
                mailer: self,
                template_name: id,
                email: &email,
                context,
                sent_count,
            })
            .map_err(|source| MailError::Hook {
                stage: HookStage::AfterSend,
                source,
            })?;

        tracing::info!(
            template = %id,
            transport = self.transport.name(),
            sent_count = sent_count,
            "Email sent"
        );

        Ok(sent_count)
    }

    /// Queue the template for sending by a worker.
    ///
    /// The context is converted to JSON here, so values that cannot be
    /// represented fail immediately instead of inside the worker. Returns the
    /// id of the queued job.
    #[tracing::instrument(name = "mailer.enqueue", skip(self, id, context, options), fields(template = %id))]
    pub async fn enqueue<C>(&self, id: &TemplateId, context: &C, options: SendOptions) -> Result<Uuid>
    where
        C: Serialize + ?Sized,
    {
        if !self.registry.contains(id) {
            return Err(MailError::TemplateNotFound(id.clone()));
        }

        let context = context_to_json(context)?;

        let queue = self
            .queue_backend
            .as_ref()
            .filter(|queue| queue.is_enabled())
            .ok_or(QueueError::Disabled)?;

        let job = EmailJob::new(id.clone(), context, options);
        let job_id = job.id;

        if let Err(e) = queue.push(job).await {
            if matches!(e, QueueError::Full { .. }) {
                QueueMetrics::record_rejected();
            }
            tracing::warn!(template = %id, error = %e, "Failed to enqueue email");
            return Err(e.into());
        }

        self.stats.total_enqueued.fetch_add(1, Ordering::Relaxed);
        QueueMetrics::record_enqueued();

        tracing::debug!(template = %id, job_id = %job_id, "Email enqueued");

        Ok(job_id)
    }
}

/// Convert a serializable context into a render context.
///
/// The value must serialize to a JSON object; `null` (e.g. `None` or `()`)
/// is accepted as an empty context.
pub fn context_to_json<C>(context: &C) -> Result<RenderContext>
where
    C: Serialize + ?Sized,
{
    match serde_json::to_value(context) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(serde_json::Value::Null) => Ok(RenderContext::new()),
        Ok(other) => Err(MailError::Serialization(format!(
            "context must serialize to a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(MailError::Serialization(e.to_string())),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn failure_stage(error: &MailError) -> &'static str {
    match error {
        MailError::TemplateNotFound(_) => "lookup",
        MailError::Render(_) => "render",
        MailError::Hook { stage, .. } => stage.as_str(),
        MailError::Transport(_) => "transport",
        MailError::Serialization(_) | MailError::Queue(_) => "enqueue",
        MailError::Config(_) => "config",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use serde_json::json;

    use crate::mailer::transport::MemoryTransport;
    use crate::template::PlaceholderTemplate;

    #[test]
    fn test_stats_snapshot() {
        let stats = MailerStats::default();
        stats.total_sent.fetch_add(10, Ordering::Relaxed);
        stats.total_delivered.fetch_add(25, Ordering::Relaxed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_sent, 10);
        assert_eq!(snapshot.total_delivered, 25);
        assert_eq!(snapshot.total_failed, 0);
    }

    #[test]
    fn test_send_updates_stats() {
        let transport = Arc::new(MemoryTransport::new());
        let mailer = Mailer::new(transport.clone());
        let id = TemplateId::new("welcome");
        mailer.register(
            id.clone(),
            MessageTemplate::builder()
                .subject(PlaceholderTemplate::new("Hi {{name}}"))
                .to("a@example.com")
                .build(),
        );

        let context = json!({"name": "Ada"}).as_object().cloned().unwrap();
        mailer.send(&id, &context, SendOptions::default()).unwrap();
        let missing = mailer.send(&TemplateId::new("missing"), &context, SendOptions::default());

        assert!(matches!(missing, Err(MailError::TemplateNotFound(_))));
        let stats = mailer.stats();
        assert_eq!(stats.total_sent, 1);
        assert_eq!(stats.total_delivered, 1);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(transport.len(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = MailerConfig {
            default_from: Some("noreply@example.com".to_string()),
            fail_silently: true,
            inline_css: false,
            ..Default::default()
        };
        let transport = Arc::new(MemoryTransport::new());
        let mailer = Mailer::from_config(&config, Arc::new(TemplateRegistry::new()), transport.clone());

        let id = TemplateId::new("styled");
        mailer.register(
            id.clone(),
            MessageTemplate::builder()
                .alternative(crate::template::AlternativeTemplate::html(
                    "<style>b { color: red }</style><b>x</b>",
                ))
                .build(),
        );

        assert!(mailer.send_options().fail_silently);
        mailer.send(&id, &RenderContext::new(), mailer.send_options()).unwrap();

        let sent = transport.take();
        assert_eq!(sent[0].from.as_deref(), Some("noreply@example.com"));
        assert_eq!(
            sent[0].alternatives[0].content,
            "<style>b { color: red }</style><b>x</b>"
        );
    }

    #[test]
    fn test_context_to_json_accepts_objects_and_null() {
        #[derive(Serialize)]
        struct Invitation {
            action_url: String,
            project_name: &'static str,
        }

        let context = context_to_json(&Invitation {
            action_url: "https://example.com/invite/abc".to_string(),
            project_name: "Acme",
        })
        .unwrap();
        assert_eq!(context["project_name"], "Acme");

        assert!(context_to_json(&Option::<Invitation>::None).unwrap().is_empty());
    }

    #[test]
    fn test_context_to_json_rejects_non_objects() {
        let result = context_to_json(&vec![1, 2, 3]);
        assert!(matches!(result, Err(MailError::Serialization(msg)) if msg.contains("an array")));

        let mut bad_keys = HashMap::new();
        bad_keys.insert((1, 2), "tuple keys are not JSON");
        assert!(matches!(
            context_to_json(&bad_keys),
            Err(MailError::Serialization(_))
        ));
    }
}
