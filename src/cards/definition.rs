//! Knowledge templates - static card data.
//!
//! `KnowledgeTemplate` holds the immutable properties of a knowledge card:
//! its cost, which effect handler drives it, how strong the effect is and
//! how long it stays on the field. Per-copy data (instance id, current
//! rotation) lives in `KnowledgeInstance`.

use serde::{Deserialize, Serialize};

use crate::core::TemplateId;

/// Effect tag: the key an effect handler is registered under.
///
/// Tags are open-ended strings so catalogs can introduce new effects by
/// registering a handler for a new tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectTag(pub String);

impl EffectTag {
    /// Deals its magnitude as raw combat damage when the holder is ready.
    pub const STRIKE: &'static str = "strike";
    /// Restores its magnitude of power to the owner on entry.
    pub const MEND: &'static str = "mend";
    /// Removes its magnitude of power from the opponent on entry.
    pub const DRAIN: &'static str = "drain";
    /// Wins the match for its owner once it completes on the field.
    pub const FINAL: &'static str = "final";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EffectTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rotation at which knowledge is spent unless the template says otherwise.
pub const DEFAULT_LIFETIME: u16 = 270;

/// Static knowledge card definition.
///
/// ## Example
///
/// ```
/// use ccg_duel::cards::{EffectTag, KnowledgeTemplate};
/// use ccg_duel::core::TemplateId;
///
/// let lance = KnowledgeTemplate::new(TemplateId::new(2), "Lance", 3, EffectTag::STRIKE)
///     .with_magnitude(6);
///
/// assert_eq!(lance.cost, 3);
/// assert_eq!(lance.magnitude, 6);
/// assert_eq!(lance.lifetime, 270);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeTemplate {
    pub id: TemplateId,

    /// Card name (for display and log lines).
    pub name: String,

    /// Wisdom a creature needs to hold this card.
    pub cost: u32,

    /// Which effect handler drives this card.
    pub effect: EffectTag,

    /// Effect strength; interpretation is up to the handler.
    pub magnitude: u32,

    /// Rotation (multiple of 90) at which the card is spent and leaves the field.
    pub lifetime: u16,
}

impl KnowledgeTemplate {
    /// Create a template with magnitude 0 and the default lifetime.
    #[must_use]
    pub fn new(id: TemplateId, name: impl Into<String>, cost: u32, effect: &str) -> Self {
        Self {
            id,
            name: name.into(),
            cost,
            effect: EffectTag::new(effect),
            magnitude: 0,
            lifetime: DEFAULT_LIFETIME,
        }
    }

    /// Set the effect magnitude (builder pattern).
    #[must_use]
    pub fn with_magnitude(mut self, magnitude: u32) -> Self {
        self.magnitude = magnitude;
        self
    }

    /// Set the lifetime (builder pattern). Rounded down to a multiple of 90.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: u16) -> Self {
        self.lifetime = (lifetime / 90) * 90;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_builder() {
        let t = KnowledgeTemplate::new(TemplateId::new(1), "Spark", 1, EffectTag::STRIKE)
            .with_magnitude(3)
            .with_lifetime(180);

        assert_eq!(t.name, "Spark");
        assert_eq!(t.effect.as_str(), "strike");
        assert_eq!(t.magnitude, 3);
        assert_eq!(t.lifetime, 180);
    }

    #[test]
    fn test_lifetime_rounds_to_quarter_turns() {
        let t = KnowledgeTemplate::new(TemplateId::new(1), "Odd", 1, EffectTag::MEND)
            .with_lifetime(200);
        assert_eq!(t.lifetime, 180);
    }
}
