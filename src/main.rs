use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tera::Tera;
use tokio::signal;
use tokio::sync::broadcast;

use mailing::config::Settings;
use mailing::mailer::{LogTransport, Mailer, MergeOverride, SendOptions};
use mailing::queue::{create_task_queue, QueueWorker, WorkerConfig};
use mailing::telemetry::init_tracing;
use mailing::template::{
    create_template_registry, load_templates, AlternativeTemplate, MessageTemplate, TemplateId,
    TeraTemplate,
};

const PROJECT_NAME: &str = "Acme";

#[derive(Debug, Serialize)]
struct InvitationContext<'a> {
    action_url: String,
    project_name: &'a str,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    init_tracing(&settings.logging)?;
    tracing::info!("Configuration loaded");

    let registry = create_template_registry();
    let queue = create_task_queue(&settings.queue);

    let mut mailer = Mailer::from_config(
        &settings.mailer,
        registry,
        Arc::new(LogTransport::full()),
    )
    .with_queue(queue.clone());

    mailer.hooks_mut().connect_after_send(|event| {
        tracing::info!(
            template = %event.template_name,
            sent_count = event.sent_count,
            "after_send"
        );
        Ok(())
    });

    let templates = load_templates(&settings.mailer.template_glob)?;
    let mailer = Arc::new(mailer);
    let user_invitation = register_user_invitation(&mailer, templates)?;

    // Synchronous send with per-call recipients
    let context = serde_json::to_value(InvitationContext {
        action_url: "https://app.example.com/invite/7f3a".to_string(),
        project_name: PROJECT_NAME,
    })?;
    let context = context.as_object().cloned().unwrap_or_default();

    let sent = mailer.send(
        &user_invitation,
        &context,
        mailer
            .send_options()
            .merge(MergeOverride::new().to("ada@example.com")),
    )?;
    tracing::info!(sent_count = sent, "Invitation sent");

    if !queue.is_enabled() {
        tracing::info!("Queue disabled, set MAILING__QUEUE__ENABLED=true to try enqueue");
        return Ok(());
    }

    let (shutdown_tx, _) = broadcast::channel(1);
    let worker_handle = QueueWorker::new(
        mailer.clone(),
        queue.clone(),
        WorkerConfig::from(&settings.queue),
        shutdown_tx.subscribe(),
    )
    .spawn();

    let job_id = mailer
        .enqueue(
            &user_invitation,
            &InvitationContext {
                action_url: "https://app.example.com/invite/91bc".to_string(),
                project_name: PROJECT_NAME,
            },
            SendOptions::new().merge(MergeOverride::new().to("grace@example.com")),
        )
        .await?;
    tracing::info!(job_id = %job_id, "Invitation enqueued");

    tokio::select! {
        _ = wait_for_drain(&queue) => {
            tracing::info!("Queue drained");
        }
        _ = shutdown_signal() => {}
    }

    let _ = shutdown_tx.send(());
    worker_handle.await?;

    tracing::info!(stats = ?mailer.stats(), "Shutdown complete");
    Ok(())
}

fn register_user_invitation(mailer: &Mailer, templates: Arc<Tera>) -> Result<TemplateId> {
    let id = TemplateId::new("user_invitation");

    mailer.register(
        id.clone(),
        MessageTemplate::builder()
            .subject(format!("You have been invited to {PROJECT_NAME}."))
            .bcc("invitations@example.com")
            .body(TeraTemplate::new(templates.clone(), "email/no-body.txt")?)
            .alternative(AlternativeTemplate::html(TeraTemplate::new(
                templates,
                "postmark/user_invitation.html",
            )?))
            .build(),
    );

    Ok(id)
}

async fn wait_for_drain(queue: &Arc<dyn mailing::queue::TaskQueue>) {
    while !queue.is_empty().await {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, initiating shutdown");
}
