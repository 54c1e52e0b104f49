use thiserror::Error;

use crate::mailer::{HookError, HookStage, TransportError};
use crate::queue::QueueError;
use crate::template::{RenderError, TemplateId};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Template not found: {0}")]
    TemplateNotFound(TemplateId),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Context is not serializable: {0}")]
    Serialization(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Hook {stage} failed: {source}")]
    Hook {
        stage: HookStage,
        #[source]
        source: HookError,
    },

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl MailError {
    /// Stable error code, used for metric labels and logs
    pub fn code(&self) -> &'static str {
        match self {
            MailError::Config(_) => "CONFIG_ERROR",
            MailError::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            MailError::Render(_) => "RENDER_ERROR",
            MailError::Serialization(_) => "SERIALIZATION_ERROR",
            MailError::Transport(_) => "TRANSPORT_ERROR",
            MailError::Hook { .. } => "HOOK_ERROR",
            MailError::Queue(_) => "QUEUE_ERROR",
        }
    }

    /// Whether running the same job again may succeed.
    ///
    /// Missing templates, render failures and unserializable contexts fail
    /// identically on every attempt. An `after_send` failure means the
    /// message already went out, so a rerun would deliver it twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            MailError::Hook {
                stage: HookStage::AfterSend,
                ..
            } => false,
            MailError::Transport(_) | MailError::Hook { .. } | MailError::Queue(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(MailError::Transport(TransportError::Unavailable("smtp down".into())).is_retryable());
        assert!(MailError::Hook {
            stage: HookStage::BeforeSend,
            source: HookError::rejected("rate limited"),
        }
        .is_retryable());

        assert!(!MailError::Hook {
            stage: HookStage::AfterSend,
            source: HookError::rejected("audit log unavailable"),
        }
        .is_retryable());
        assert!(!MailError::TemplateNotFound(TemplateId::new("gone")).is_retryable());
        assert!(!MailError::Render(RenderError::MissingVariable("name".into())).is_retryable());
        assert!(!MailError::Serialization("bad".into()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = MailError::TemplateNotFound(TemplateId::new("welcome"));
        assert_eq!(err.to_string(), "Template not found: welcome");
        assert_eq!(err.code(), "TEMPLATE_NOT_FOUND");

        let err = MailError::Hook {
            stage: HookStage::AfterSend,
            source: HookError::rejected("audit log unavailable"),
        };
        assert_eq!(
            err.to_string(),
            "Hook after_send failed: audit log unavailable"
        );
    }
}
