//! Template data types

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::renderable::Renderable;

/// Variables available to a template while rendering
pub type RenderContext = serde_json::Map<String, serde_json::Value>;

/// Media type that triggers HTML post-processing
pub const TEXT_HTML: &str = "text/html";

/// Opaque name of a registered template.
///
/// Cloning is cheap. Two ids built from the same name compare equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(Arc<str>);

impl TemplateId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateId({:?})", &*self.0)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TemplateId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Serialize for TemplateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TemplateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(TemplateId::from)
    }
}

/// A single message header
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// File attached to a message.
///
/// Equality covers the file name, media type and content bytes, so the same
/// file supplied twice is only attached once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }
}

/// Unrendered alternative body part
#[derive(Debug, Clone)]
pub struct AlternativeTemplate {
    pub content: Arc<dyn Renderable>,
    pub mime_type: String,
}

impl AlternativeTemplate {
    pub fn new(content: impl Renderable + 'static, mime_type: impl Into<String>) -> Self {
        Self {
            content: Arc::new(content),
            mime_type: mime_type.into(),
        }
    }

    /// HTML alternative, post-processed after rendering
    pub fn html(content: impl Renderable + 'static) -> Self {
        Self::new(content, TEXT_HTML)
    }
}

/// Registered message prototype.
///
/// Never mutated once registered: every send renders a fresh message from it.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    /// Sender address, falls back to the mailer default when absent
    pub from: Option<String>,
    pub subject: Arc<dyn Renderable>,
    pub body: Arc<dyn Renderable>,
    /// Alternative body parts in MIME preference order
    pub alternatives: Vec<AlternativeTemplate>,
    pub to: BTreeSet<String>,
    pub cc: BTreeSet<String>,
    pub bcc: BTreeSet<String>,
    pub reply_to: BTreeSet<String>,
    pub attachments: BTreeSet<Attachment>,
    pub headers: BTreeSet<Header>,
}

impl MessageTemplate {
    pub fn builder() -> MessageTemplateBuilder {
        MessageTemplateBuilder::default()
    }
}

/// Builder for message templates
#[derive(Debug, Default)]
pub struct MessageTemplateBuilder {
    from: Option<String>,
    subject: Option<Arc<dyn Renderable>>,
    body: Option<Arc<dyn Renderable>>,
    alternatives: Vec<AlternativeTemplate>,
    to: BTreeSet<String>,
    cc: BTreeSet<String>,
    bcc: BTreeSet<String>,
    reply_to: BTreeSet<String>,
    attachments: BTreeSet<Attachment>,
    headers: BTreeSet<Header>,
}

impl MessageTemplateBuilder {
    /// Set the sender address
    pub fn sender(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    pub fn subject(mut self, subject: impl Renderable + 'static) -> Self {
        self.subject = Some(Arc::new(subject));
        self
    }

    pub fn body(mut self, body: impl Renderable + 'static) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    pub fn alternative(mut self, alternative: AlternativeTemplate) -> Self {
        self.alternatives.push(alternative);
        self
    }

    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.insert(address.into());
        self
    }

    pub fn cc(mut self, address: impl Into<String>) -> Self {
        self.cc.insert(address.into());
        self
    }

    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc.insert(address.into());
        self
    }

    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to.insert(address.into());
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.insert(attachment);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(Header::new(name, value));
        self
    }

    /// Build the template. Missing subject or body render as empty strings.
    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            from: self.from,
            subject: self.subject.unwrap_or_else(|| Arc::new(String::new())),
            body: self.body.unwrap_or_else(|| Arc::new(String::new())),
            alternatives: self.alternatives,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            reply_to: self.reply_to,
            attachments: self.attachments,
            headers: self.headers,
        }
    }
}
