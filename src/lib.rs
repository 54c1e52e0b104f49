// Shared components
pub mod config;
pub mod error;
pub mod metrics;

// Templates and dispatch
pub mod mailer;
pub mod template;

// Deferred sending
pub mod queue;

// Supporting modules
pub mod telemetry;

pub use error::{MailError, Result};
pub use mailer::{Mailer, MergeOverride, SendOptions};
pub use template::{MessageTemplate, RenderContext, TemplateId, TemplateRegistry};
