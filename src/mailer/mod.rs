//! Rendering and dispatch of registered message templates.
//!
//! The [`Mailer`] looks a template up by id, renders it against a context,
//! merges per-call recipients in, and hands the result to a [`Transport`].
//! Subscribers on the [`HookBus`] observe (and may veto) each send.

mod dispatcher;
mod hooks;
mod html;
mod merge;
mod message;
mod renderer;
mod transport;

pub use dispatcher::{context_to_json, Mailer, MailerStats, MailerStatsSnapshot};
pub use hooks::{AfterSend, BeforeRender, BeforeSend, HookBus, HookError, HookStage};
pub use html::{HtmlTransform, Passthrough, StyleInliner};
pub use merge::merge_message;
pub use message::{Alternative, MergeOverride, RenderedMessage, SendOptions};
pub use renderer::Renderer;
pub use transport::{LogTransport, MemoryTransport, Transport, TransportError};
