//! Template registry

use std::sync::Arc;

use dashmap::DashMap;

use super::types::{MessageTemplate, TemplateId};

/// Registered message prototypes keyed by id.
///
/// Entries can be overwritten but never removed. Lookups hand out the shared
/// prototype, so callers always see the registered instance.
pub struct TemplateRegistry {
    templates: DashMap<TemplateId, Arc<MessageTemplate>>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
        }
    }

    /// Store a prototype under `id`, replacing any previous entry
    pub fn register(&self, id: TemplateId, template: MessageTemplate) -> Arc<MessageTemplate> {
        self.register_shared(id, Arc::new(template))
    }

    /// Store an already shared prototype under `id`
    pub fn register_shared(
        &self,
        id: TemplateId,
        template: Arc<MessageTemplate>,
    ) -> Arc<MessageTemplate> {
        if self.templates.insert(id.clone(), template.clone()).is_some() {
            tracing::debug!(template = %id, "Replaced registered template");
        } else {
            tracing::debug!(template = %id, "Registered template");
        }
        template
    }

    /// Get the prototype registered under `id`
    pub fn lookup(&self, id: &TemplateId) -> Option<Arc<MessageTemplate>> {
        self.templates.get(id).map(|entry| entry.value().clone())
    }

    /// Check if a template is registered
    pub fn contains(&self, id: &TemplateId) -> bool {
        self.templates.contains_key(id)
    }

    /// Registered ids, in no particular order
    pub fn ids(&self) -> Vec<TemplateId> {
        self.templates.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Get the number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Create an Arc-wrapped template registry
pub fn create_template_registry() -> Arc<TemplateRegistry> {
    Arc::new(TemplateRegistry::new())
}
