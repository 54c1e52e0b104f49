//! Rendered messages and merge overrides

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::template::{Attachment, Header, TEXT_HTML};

/// Rendered alternative body part
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alternative {
    pub content: String,
    pub mime_type: String,
}

impl Alternative {
    pub fn new(content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn html(content: impl Into<String>) -> Self {
        Self::new(content, TEXT_HTML)
    }

    pub fn is_html(&self) -> bool {
        self.mime_type == TEXT_HTML
    }
}

/// A fully rendered message, created per send and never reused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub from: Option<String>,
    pub subject: String,
    pub body: String,
    pub alternatives: Vec<Alternative>,
    pub to: BTreeSet<String>,
    pub cc: BTreeSet<String>,
    pub bcc: BTreeSet<String>,
    pub reply_to: BTreeSet<String>,
    pub attachments: BTreeSet<Attachment>,
    pub headers: BTreeSet<Header>,
}

impl RenderedMessage {
    /// All envelope recipients (to, cc and bcc)
    pub fn recipients(&self) -> impl Iterator<Item = &String> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }
}

/// Extra fields combined into a rendered message before it is sent.
///
/// Empty fields contribute nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOverride {
    pub to: BTreeSet<String>,
    pub cc: BTreeSet<String>,
    pub bcc: BTreeSet<String>,
    pub reply_to: BTreeSet<String>,
    pub attachments: BTreeSet<Attachment>,
    pub headers: BTreeSet<Header>,
    pub alternatives: Vec<Alternative>,
}

impl MergeOverride {
    pub fn new() -> Self {
        Self::default()
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

    pub fn alternative(mut self, alternative: Alternative) -> Self {
        self.alternatives.push(alternative);
        self
    }
}

/// Per-call options for `Mailer::send` and `Mailer::enqueue`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendOptions {
    /// Fields merged into the rendered message
    pub merge: Option<MergeOverride>,
    /// Report transport failures as zero delivered instead of an error
    pub fail_silently: bool,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(mut self, merge: MergeOverride) -> Self {
        self.merge = Some(merge);
        self
    }

    pub fn fail_silently(mut self, fail_silently: bool) -> Self {
        self.fail_silently = fail_silently;
        self
    }
}
