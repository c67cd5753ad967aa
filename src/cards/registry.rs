//! Knowledge registry for template lookup.
//!
//! The `KnowledgeRegistry` stores the catalog of knowledge templates a match
//! is dealt from. Loading a real catalog is the application's job; the
//! registry ships a small starter catalog (`standard`) so a match can be
//! dealt without external data.

use rustc_hash::FxHashMap;

use super::definition::{EffectTag, KnowledgeTemplate};
use crate::core::TemplateId;

/// Registry of knowledge templates.
///
/// ## Example
///
/// ```
/// use ccg_duel::cards::{EffectTag, KnowledgeRegistry, KnowledgeTemplate};
/// use ccg_duel::core::TemplateId;
///
/// let mut registry = KnowledgeRegistry::new();
/// registry.register(
///     KnowledgeTemplate::new(TemplateId::new(1), "Spark", 1, EffectTag::STRIKE).with_magnitude(3),
/// );
///
/// assert_eq!(registry.get(TemplateId::new(1)).unwrap().name, "Spark");
/// ```
#[derive(Clone, Debug, Default)]
pub struct KnowledgeRegistry {
    templates: FxHashMap<TemplateId, KnowledgeTemplate>,
}

impl KnowledgeRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in starter catalog.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(
            KnowledgeTemplate::new(TemplateId::new(1), "Spark", 1, EffectTag::STRIKE).with_magnitude(3),
        );
        registry.register(
            KnowledgeTemplate::new(TemplateId::new(2), "Lance", 3, EffectTag::STRIKE).with_magnitude(6),
        );
        registry.register(
            KnowledgeTemplate::new(TemplateId::new(3), "Tempest", 5, EffectTag::STRIKE).with_magnitude(10),
        );
        registry.register(
            KnowledgeTemplate::new(TemplateId::new(4), "Mend", 2, EffectTag::MEND)
                .with_magnitude(3)
                .with_lifetime(90),
        );
        registry.register(
            KnowledgeTemplate::new(TemplateId::new(5), "Siphon", 2, EffectTag::DRAIN)
                .with_magnitude(2)
                .with_lifetime(180),
        );
        registry.register(KnowledgeTemplate::new(TemplateId::new(6), "Last Word", 6, EffectTag::FINAL));
        registry
    }

    /// Register a template.
    ///
    /// Panics if a template with the same ID already exists.
    pub fn register(&mut self, template: KnowledgeTemplate) {
        if self.templates.contains_key(&template.id) {
            panic!("Template with ID {:?} already registered", template.id);
        }
        self.templates.insert(template.id, template);
    }

    /// Get a template by ID.
    #[must_use]
    pub fn get(&self, id: TemplateId) -> Option<&KnowledgeTemplate> {
        self.templates.get(&id)
    }

    /// Check if a template ID is registered.
    #[must_use]
    pub fn contains(&self, id: TemplateId) -> bool {
        self.templates.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template ids in ascending order.
    ///
    /// Deck construction iterates this, so the order must not depend on
    /// hash map layout.
    #[must_use]
    pub fn ids(&self) -> Vec<TemplateId> {
        let mut ids: Vec<_> = self.templates.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all templates (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeTemplate> {
        self.templates.values()
    }
}
