//! Knowledge instances - one physical copy of a knowledge card.
//!
//! An instance is minted when its template leaves the deck and stays the
//! same copy (same `instance_id`) while it moves market → hand → field.
//! Cost and effect tag are copied from the template at mint time so a
//! snapshot is self-describing for the UI.

use serde::{Deserialize, Serialize};

use super::definition::{EffectTag, KnowledgeTemplate};
use crate::core::{InstanceId, TemplateId};

/// A knowledge card copy in a match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeInstance {
    pub template_id: TemplateId,
    pub instance_id: InstanceId,
    pub cost: u32,
    pub effect: EffectTag,

    /// Rotation on the field (0, 90, 180, 270). Always 0 off the field.
    pub rotation: u16,
}

impl KnowledgeInstance {
    /// Mint a fresh copy of a template.
    #[must_use]
    pub fn mint(template: &KnowledgeTemplate, instance_id: InstanceId) -> Self {
        Self {
            template_id: template.id,
            instance_id,
            cost: template.cost,
            effect: template.effect.clone(),
            rotation: 0,
        }
    }

    /// Does this copy match both ids of an action payload?
    #[must_use]
    pub fn matches(&self, template_id: TemplateId, instance_id: InstanceId) -> bool {
        self.template_id == template_id && self.instance_id == instance_id
    }
}
