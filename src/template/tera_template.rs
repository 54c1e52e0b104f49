//! Tera-backed file templates.
//!
//! Templates are loaded once at startup, usually from a glob such as
//! `templates/**/*`, and parts reference them by name. Names ending in
//! `.html`, `.htm` or `.xml` are autoescaped by Tera.

use std::error::Error as _;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tera::{Context, Tera};

use super::renderable::{RenderError, Renderable};
use super::types::RenderContext;

/// Load every template matching `glob` into a shared engine
pub fn load_templates(glob: &str) -> Result<Arc<Tera>, RenderError> {
    if !glob.contains('*') {
        return Err(RenderError::Other(format!(
            "template glob '{}' has no wildcard",
            glob
        )));
    }

    let engine = Tera::new(glob).map_err(|e| RenderError::Other(describe(&e)))?;

    tracing::info!(
        glob = %glob,
        templates = engine.get_template_names().count(),
        "Templates loaded"
    );

    Ok(Arc::new(engine))
}

/// One named template of a shared Tera engine
#[derive(Clone)]
pub struct TeraTemplate {
    engine: Arc<Tera>,
    name: String,
}

impl TeraTemplate {
    /// Reference a template already loaded into `engine`
    pub fn new(engine: Arc<Tera>, name: impl Into<String>) -> Result<Self, RenderError> {
        let name = name.into();
        if !engine.get_template_names().any(|loaded| loaded == name) {
            return Err(RenderError::Other(format!("template '{}' not found", name)));
        }

        Ok(Self { engine, name })
    }

    /// Compile a single template from source
    pub fn from_source(name: impl Into<String>, source: &str) -> Result<Self, RenderError> {
        let name = name.into();
        let mut engine = Tera::default();
        engine
            .add_raw_template(&name, source)
            .map_err(|e| RenderError::Other(describe(&e)))?;

        Ok(Self {
            engine: Arc::new(engine),
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for TeraTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeraTemplate").field("name", &self.name).finish()
    }
}

impl Renderable for TeraTemplate {
    fn render(&self, context: &RenderContext) -> Result<String, RenderError> {
        let context = Context::from_value(Value::Object(context.clone()))
            .map_err(|e| RenderError::Other(describe(&e)))?;

        self.engine
            .render(&self.name, &context)
            .map_err(|e| RenderError::Other(describe(&e)))
    }
}

/// Tera keeps the useful part of a failure in the source chain
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
