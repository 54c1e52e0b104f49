//! Prototype rendering

use std::sync::Arc;

use crate::template::{AlternativeTemplate, MessageTemplate, RenderContext, RenderError, TEXT_HTML};

use super::html::{HtmlTransform, StyleInliner};
use super::message::{Alternative, RenderedMessage};

/// Renders registered prototypes into concrete messages.
///
/// The prototype is only borrowed; every call builds a new message, so
/// values from one context can never leak into another send.
pub struct Renderer {
    html_transform: Arc<dyn HtmlTransform>,
    default_from: Option<String>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Arc::new(StyleInliner))
    }
}

impl Renderer {
    pub fn new(html_transform: Arc<dyn HtmlTransform>) -> Self {
        Self {
            html_transform,
            default_from: None,
        }
    }

    /// Sender used when a template does not set one
    pub fn with_default_from(mut self, from: Option<String>) -> Self {
        self.default_from = from;
        self
    }

    /// Render subject, body and alternatives against `context`.
    ///
    /// Fails on the first part that cannot be rendered.
    pub fn render(
        &self,
        template: &MessageTemplate,
        context: &RenderContext,
    ) -> Result<RenderedMessage, RenderError> {
        let subject = template.subject.render(context)?;
        let body = template.body.render(context)?;
        let alternatives = template
            .alternatives
            .iter()
            .map(|alt| self.render_alternative(alt, context))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RenderedMessage {
            from: template.from.clone().or_else(|| self.default_from.clone()),
            subject,
            body,
            alternatives,
            to: template.to.clone(),
            cc: template.cc.clone(),
            bcc: template.bcc.clone(),
            reply_to: template.reply_to.clone(),
            attachments: template.attachments.clone(),
            headers: template.headers.clone(),
        })
    }

    fn render_alternative(
        &self,
        alternative: &AlternativeTemplate,
        context: &RenderContext,
    ) -> Result<Alternative, RenderError> {
        let mut content = alternative.content.render(context)?;

        if alternative.mime_type == TEXT_HTML {
            content = self.html_transform.transform(&content)?;
        }

        Ok(Alternative::new(content, alternative.mime_type.clone()))
    }
}
