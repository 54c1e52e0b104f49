//! Message templates.
//!
//! This module provides:
//! - Template identifiers and the immutable message prototype
//! - The `Renderable` capability shared by subjects, bodies and alternatives
//! - `{{variable}}` placeholder templates
//! - Tera templates loaded from files
//! - A concurrent registry mapping ids to prototypes
//!
//! # Example
//!
//! ```ignore
//! let registry = TemplateRegistry::new();
//!
//! registry.register(
//!     TemplateId::new("order-shipped"),
//!     MessageTemplate::builder()
//!         .subject(PlaceholderTemplate::new("Order {{order_id}} shipped"))
//!         .body(PlaceholderTemplate::new("It is on its way via {{carrier}}"))
//!         .alternative(AlternativeTemplate::html(PlaceholderTemplate::html(
//!             "<p>Order <b>{{order_id}}</b> is on its way</p>",
//!         )))
//!         .build(),
//! );
//! ```

mod placeholder;
mod registry;
mod renderable;
mod tera_template;
mod types;

pub use placeholder::PlaceholderTemplate;
pub use registry::{create_template_registry, TemplateRegistry};
pub use renderable::{RenderError, Renderable};
pub use tera_template::{load_templates, TeraTemplate};
pub use types::{
    AlternativeTemplate, Attachment, Header, MessageTemplate, MessageTemplateBuilder,
    RenderContext, TemplateId, TEXT_HTML,
};
