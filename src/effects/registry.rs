//! Effect registry: handlers keyed by effect tag.

use rustc_hash::FxHashMap;

use super::handler::{DrainEffect, EffectHandler, FinalEffect, MendEffect, StrikeEffect};
use crate::cards::EffectTag;

/// Registry of effect handlers.
///
/// Cards whose tag has no handler behave as plain cards: no entry effect,
/// no combat damage, nothing on completion.
///
/// ## Example
///
/// ```
/// use ccg_duel::cards::EffectTag;
/// use ccg_duel::effects::EffectRegistry;
///
/// let registry = EffectRegistry::standard();
/// assert!(registry.get(&EffectTag::new(EffectTag::STRIKE)).is_some());
/// assert!(registry.get(&EffectTag::new("unknown")).is_none());
/// ```
#[derive(Default)]
pub struct EffectRegistry {
    handlers: FxHashMap<EffectTag, Box<dyn EffectHandler>>,
}

impl EffectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers for the built-in tags.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(EffectTag::STRIKE, StrikeEffect);
        registry.register(EffectTag::MEND, MendEffect);
        registry.register(EffectTag::DRAIN, DrainEffect);
        registry.register(EffectTag::FINAL, FinalEffect);
        registry
    }

    /// Register a handler for a tag.
    ///
    /// Panics if the tag already has a handler.
    pub fn register(&mut self, tag: &str, handler: impl EffectHandler + 'static) {
        let tag = EffectTag::new(tag);
        if self.handlers.contains_key(&tag) {
            panic!("Effect handler for {tag} already registered");
        }
        self.handlers.insert(tag, Box::new(handler));
    }

    #[must_use]
    pub fn get(&self, tag: &EffectTag) -> Option<&dyn EffectHandler> {
        self.handlers.get(tag).map(|h| h.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.handlers.keys().map(EffectTag::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("EffectRegistry").field("tags", &tags).finish()
    }
}
