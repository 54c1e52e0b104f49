//! Render capability shared by every template part

use std::fmt;

use thiserror::Error;

use super::types::RenderContext;

/// Rendering failure
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Missing template variable: {0}")]
    MissingVariable(String),

    #[error("Template syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("HTML transform failed: {0}")]
    Transform(String),

    #[error("Render failed: {0}")]
    Other(String),
}

/// Anything that turns a context into final text.
///
/// Implementations must only depend on the context passed in. Plain strings
/// implement this trait and render to themselves.
pub trait Renderable: Send + Sync + fmt::Debug {
    fn render(&self, context: &RenderContext) -> Result<String, RenderError>;
}

impl Renderable for String {
    fn render(&self, _context: &RenderContext) -> Result<String, RenderError> {
        Ok(self.clone())
    }
}

impl Renderable for &'static str {
    fn render(&self, _context: &RenderContext) -> Result<String, RenderError> {
        Ok((*self).to_string())
    }
}
