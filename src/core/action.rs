//! Action representation: one tagged variant per move.
//!
//! Actions arrive from the UI/application layer as intents of the form
//! `{ "type": "ROTATE_CREATURE", "payload": { "playerId": ..., ... } }` and
//! are the only way a match changes. Every gameplay action names its actor;
//! `SET_STATE` is not a move at all and only carries a remote snapshot.
//!
//! ## Example
//!
//! ```
//! use ccg_duel::core::{Action, CreatureId, PlayerId};
//!
//! let rotate = Action::rotate(PlayerId::new("alice"), CreatureId::new(1));
//! let json = serde_json::to_value(&rotate).unwrap();
//!
//! assert_eq!(json["type"], "ROTATE_CREATURE");
//! assert_eq!(json["payload"]["playerId"], "alice");
//! assert_eq!(json["payload"]["creatureId"], 1);
//! ```

use serde::{Deserialize, Serialize};

use super::entity::{CreatureId, InstanceId, TemplateId};
use super::player::PlayerId;
use super::state::{MatchState, Phase};

/// A match action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Turn a creature a quarter turn; at 270 it becomes ready and attacks.
    #[serde(rename_all = "camelCase")]
    RotateCreature {
        player_id: PlayerId,
        creature_id: CreatureId,
    },

    /// Move a knowledge card from hand onto a creature's field slot.
    #[serde(rename_all = "camelCase")]
    SummonKnowledge {
        player_id: PlayerId,
        knowledge_id: TemplateId,
        instance_id: InstanceId,
        creature_id: CreatureId,
    },

    /// Take a knowledge card from the market into hand.
    #[serde(rename_all = "camelCase")]
    DrawKnowledge {
        player_id: PlayerId,
        knowledge_id: TemplateId,
        instance_id: InstanceId,
    },

    /// Run the knowledge phase and open the action phase.
    #[serde(rename_all = "camelCase")]
    ResolveKnowledge { player_id: PlayerId },

    /// Hand the turn to the opponent.
    #[serde(rename_all = "camelCase")]
    EndTurn { player_id: PlayerId },

    /// Replace local state with a snapshot received from the store.
    SetState { snapshot: Box<MatchState> },
}

/// Action discriminant, for logging and rule lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    RotateCreature,
    SummonKnowledge,
    DrawKnowledge,
    ResolveKnowledge,
    EndTurn,
    SetState,
}

impl ActionKind {
    /// Wire name of the action type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ActionKind::RotateCreature => "ROTATE_CREATURE",
            ActionKind::SummonKnowledge => "SUMMON_KNOWLEDGE",
            ActionKind::DrawKnowledge => "DRAW_KNOWLEDGE",
            ActionKind::ResolveKnowledge => "RESOLVE_KNOWLEDGE",
            ActionKind::EndTurn => "END_TURN",
            ActionKind::SetState => "SET_STATE",
        }
    }

    /// Phase this action is legal in. `None` for `SetState`.
    #[must_use]
    pub const fn required_phase(self) -> Option<Phase> {
        match self {
            ActionKind::ResolveKnowledge => Some(Phase::Knowledge),
            ActionKind::RotateCreature
            | ActionKind::SummonKnowledge
            | ActionKind::DrawKnowledge
            | ActionKind::EndTurn => Some(Phase::Action),
            ActionKind::SetState => None,
        }
    }

    /// Does this action spend one of the turn's action budget?
    #[must_use]
    pub const fn consumes_action(self) -> bool {
        matches!(
            self,
            ActionKind::RotateCreature | ActionKind::SummonKnowledge | ActionKind::DrawKnowledge
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    #[must_use]
    pub fn rotate(player_id: PlayerId, creature_id: CreatureId) -> Self {
        Action::RotateCreature {
            player_id,
            creature_id,
        }
    }

    #[must_use]
    pub fn summon(
        player_id: PlayerId,
        knowledge_id: TemplateId,
        instance_id: InstanceId,
        creature_id: CreatureId,
    ) -> Self {
        Action::SummonKnowledge {
            player_id,
            knowledge_id,
            instance_id,
            creature_id,
        }
    }

    #[must_use]
    pub fn draw(player_id: PlayerId, knowledge_id: TemplateId, instance_id: InstanceId) -> Self {
        Action::DrawKnowledge {
            player_id,
            knowledge_id,
            instance_id,
        }
    }

    #[must_use]
    pub fn resolve_knowledge(player_id: PlayerId) -> Self {
        Action::ResolveKnowledge { player_id }
    }

    #[must_use]
    pub fn end_turn(player_id: PlayerId) -> Self {
        Action::EndTurn { player_id }
    }

    #[must_use]
    pub fn set_state(snapshot: MatchState) -> Self {
        Action::SetState {
            snapshot: Box::new(snapshot),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::RotateCreature { .. } => ActionKind::RotateCreature,
            Action::SummonKnowledge { .. } => ActionKind::SummonKnowledge,
            Action::DrawKnowledge { .. } => ActionKind::DrawKnowledge,
            Action::ResolveKnowledge { .. } => ActionKind::ResolveKnowledge,
            Action::EndTurn { .. } => ActionKind::EndTurn,
            Action::SetState { .. } => ActionKind::SetState,
        }
    }

    /// The acting player. `None` for `SetState`.
    #[must_use]
    pub fn player(&self) -> Option<&PlayerId> {
        match self {
            Action::RotateCreature { player_id, .. }
            | Action::SummonKnowledge { player_id, .. }
            | Action::DrawKnowledge { player_id, .. }
            | Action::ResolveKnowledge { player_id }
            | Action::EndTurn { player_id } => Some(player_id),
            Action::SetState { .. } => None,
        }
    }

    /// Is this a player move (anything but `SetState`)?
    #[must_use]
    pub fn is_gameplay(&self) -> bool {
        !matches!(self, Action::SetState { .. })
    }
}

/// A committed action, kept in the dispatcher's audit history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// The player who took this action.
    pub player: PlayerId,

    /// The action taken.
    pub action: Action,

    /// Turn number when the action was taken.
    pub turn: u32,

    /// Position in the audit history (0-based).
    pub sequence: u32,
}

impl ActionRecord {
    #[must_use]
    pub fn new(player: PlayerId, action: Action, turn: u32, sequence: u32) -> Self {
        Self {
            player,
            action,
            turn,
            sequence,
        }
    }
}
