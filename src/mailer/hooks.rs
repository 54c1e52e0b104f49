//! Pipeline hooks fired around rendering and sending.
//!
//! Subscribers run synchronously in the order they were connected. They are
//! part of the send pipeline: the first subscriber error stops the fan-out
//! and aborts the send.

use std::fmt;

use thiserror::Error;

use crate::template::{MessageTemplate, RenderContext, TemplateId};

use super::dispatcher::Mailer;
use super::message::RenderedMessage;

/// Error returned by a hook subscriber
#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HookError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Pipeline stage a hook is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    BeforeRender,
    BeforeSend,
    AfterSend,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::BeforeRender => "before_render",
            HookStage::BeforeSend => "before_send",
            HookStage::AfterSend => "after_send",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fired after the template is resolved, before anything is rendered
pub struct BeforeRender<'a> {
    pub sender: &'a TemplateId,
    pub mailer: &'a Mailer,
    pub template_name: &'a TemplateId,
    pub email_template: &'a MessageTemplate,
    pub context: &'a RenderContext,
}

/// Fired with the rendered and merged message, before transmission
pub struct BeforeSend<'a> {
    pub sender: &'a TemplateId,
    pub mailer: &'a Mailer,
    pub template_name: &'a TemplateId,
    pub email: &'a RenderedMessage,
    pub context: &'a RenderContext,
}

/// Fired after transmission with the number of delivered messages
pub struct AfterSend<'a> {
    pub sender: &'a TemplateId,
    pub mailer: &'a Mailer,
    pub template_name: &'a TemplateId,
    pub email: &'a RenderedMessage,
    pub context: &'a RenderContext,
    pub sent_count: usize,
}

type BeforeRenderHook = Box<dyn Fn(&BeforeRender<'_>) -> Result<(), HookError> + Send + Sync>;
type BeforeSendHook = Box<dyn Fn(&BeforeSend<'_>) -> Result<(), HookError> + Send + Sync>;
type AfterSendHook = Box<dyn Fn(&AfterSend<'_>) -> Result<(), HookError> + Send + Sync>;

/// Subscriber lists for the three pipeline hooks
#[derive(Default)]
pub struct HookBus {
    before_render: Vec<BeforeRenderHook>,
    before_send: Vec<BeforeSendHook>,
    after_send: Vec<AfterSendHook>,
}

impl fmt::Debug for HookBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookBus")
            .field("before_render", &self.before_render.len())
            .field("before_send", &self.before_send.len())
            .field("after_send", &self.after_send.len())
            .finish()
    }
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_before_render<F>(&mut self, hook: F)
    where
        F: Fn(&BeforeRender<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before_render.push(Box::new(hook));
    }

    pub fn connect_before_send<F>(&mut self, hook: F)
    where
        F: Fn(&BeforeSend<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before_send.push(Box::new(hook));
    }

    pub fn connect_after_send<F>(&mut self, hook: F)
    where
        F: Fn(&AfterSend<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.after_send.push(Box::new(hook));
    }

    /// Number of subscribers connected to `stage`
    pub fn subscriber_count(&self, stage: HookStage) -> usize {
        match stage {
            HookStage::BeforeRender => self.before_render.len(),
            HookStage::BeforeSend => self.before_send.len(),
            HookStage::AfterSend => self.after_send.len(),
        }
    }

    pub(crate) fn fire_before_render(&self, event: &BeforeRender<'_>) -> Result<(), HookError> {
        self.before_render.iter().try_for_each(|hook| hook(event))
    }

    pub(crate) fn fire_before_send(&self, event: &BeforeSend<'_>) -> Result<(), HookError> {
        self.before_send.iter().try_for_each(|hook| hook(event))
    }

    pub(crate) fn fire_after_send(&self, event: &AfterSend<'_>) -> Result<(), HookError> {
        self.after_send.iter().try_for_each(|hook| hook(event))
    }
}
