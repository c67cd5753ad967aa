//! Match state: the single shared record both clients converge on.
//!
//! ## MatchState
//!
//! Everything about a match lives in one serializable value:
//! - Turn, active seat, phase, per-turn action count
//! - Per-seat player data (power, hand, creatures, field slots)
//! - Shared market and deck
//! - Winner and the append-only log
//!
//! The state is replaced wholesale on every commit and on every remote
//! snapshot, so it is cheap to clone: the deck and log are `im` vectors and
//! the per-player creature lists are inline `SmallVec`s.
//!
//! ## Wire Format
//!
//! Field names are camelCase in the store document (`matchId`,
//! `currentPlayerIndex`, `actionsTakenThisTurn`, ...) and the phase is a
//! lowercase string.

use im::Vector;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use super::config::CREATURES_PER_PLAYER;
use super::entity::{CreatureId, InstanceId, MatchId, TemplateId};
use super::player::{PlayerId, Seat, Seats};
use crate::cards::KnowledgeInstance;

/// Quarter turn: the unit every rotation moves by.
pub const ROTATION_STEP: u16 = 90;

/// Rotation at which a creature is ready and attacks.
pub const READY_ROTATION: u16 = 270;

/// A full turn; rotations are kept below it.
pub const FULL_ROTATION: u16 = 360;

/// Substring marking combat lines where defense absorbed everything.
pub const ABSORBED_LOG_MARKER: &str = "absorbs all damage";

/// Turn phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Field knowledge resolves; no action-phase moves yet.
    #[default]
    Knowledge,
    /// Rotate, summon and draw, up to the action budget.
    Action,
    /// Terminal: the match has a winner.
    End,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Knowledge => f.write_str("knowledge"),
            Phase::Action => f.write_str("action"),
            Phase::End => f.write_str("end"),
        }
    }
}

/// A player's permanent battle unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creature {
    pub id: CreatureId,
    pub owner: PlayerId,
    pub name: String,

    /// Cooldown as a rotation in {0, 90, 180, 270}; 270 means ready.
    pub rotation: u16,

    /// Caps the cost of knowledge it can hold; halved for defense.
    pub wisdom: u32,
}

impl Creature {
    #[must_use]
    pub fn new(id: CreatureId, owner: PlayerId, name: impl Into<String>, wisdom: u32) -> Self {
        Self {
            id,
            owner,
            name: name.into(),
            rotation: 0,
            wisdom,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.rotation == READY_ROTATION
    }
}

/// The knowledge slot attached to one creature.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSlot {
    pub creature_id: CreatureId,
    pub knowledge: Option<KnowledgeInstance>,
}

impl FieldSlot {
    #[must_use]
    pub fn empty(creature_id: CreatureId) -> Self {
        Self {
            creature_id,
            knowledge: None,
        }
    }
}

/// Per-seat player data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    pub power: u32,
    pub hand: Vec<KnowledgeInstance>,
    pub creatures: SmallVec<[Creature; CREATURES_PER_PLAYER]>,

    /// One slot per creature, in creature order.
    pub field: SmallVec<[FieldSlot; CREATURES_PER_PLAYER]>,
}

impl PlayerState {
    /// Create a player with an empty hand and one empty slot per creature.
    #[must_use]
    pub fn new(id: PlayerId, power: u32, creatures: impl IntoIterator<Item = Creature>) -> Self {
        let creatures: SmallVec<[Creature; CREATURES_PER_PLAYER]> = creatures.into_iter().collect();
        let field = creatures.iter().map(|c| FieldSlot::empty(c.id)).collect();
        Self {
            id,
            power,
            hand: Vec::new(),
            creatures,
            field,
        }
    }

    /// Index of a creature (and of its field slot).
    #[must_use]
    pub fn creature_index(&self, creature_id: CreatureId) -> Option<usize> {
        self.creatures.iter().position(|c| c.id == creature_id)
    }

    #[must_use]
    pub fn creature(&self, creature_id: CreatureId) -> Option<&Creature> {
        self.creatures.iter().find(|c| c.id == creature_id)
    }

    /// Position in hand of the copy named by an action payload.
    #[must_use]
    pub fn hand_index(&self, template_id: TemplateId, instance_id: InstanceId) -> Option<usize> {
        self.hand.iter().position(|k| k.matches(template_id, instance_id))
    }

    /// Knowledge currently on this player's field.
    pub fn field_knowledge(&self) -> impl Iterator<Item = &KnowledgeInstance> {
        self.field.iter().filter_map(|slot| slot.knowledge.as_ref())
    }

    #[must_use]
    pub fn is_eliminated(&self) -> bool {
        self.power == 0
    }
}

/// The complete match record.
///
/// ## Example
///
/// ```
/// use ccg_duel::core::{MatchId, Phase, PlayerId, Seat};
/// use ccg_duel::rules::{MatchRules, MatchSetup};
///
/// let setup = MatchSetup::standard(MatchId::new("m-1"), PlayerId::new("alice"), PlayerId::new("bob"));
/// let state = MatchRules::standard().deal(&setup);
///
/// assert_eq!(state.turn, 1);
/// assert_eq!(state.current_player_index, Seat::First);
/// assert_eq!(state.phase, Phase::Knowledge);
/// assert!(state.winner.is_none());
/// assert!(state.check_invariants().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub match_id: MatchId,
    pub players: Seats<PlayerState>,

    /// Face-up knowledge anyone may draw.
    pub market: Vec<KnowledgeInstance>,

    /// Templates still to enter the market, front first.
    pub deck: Vector<TemplateId>,

    /// Turn number (starts at 1; advances when seat 1 hands back to seat 0).
    pub turn: u32,
    pub current_player_index: Seat,
    pub phase: Phase,
    pub actions_taken_this_turn: u8,
    pub actions_per_turn: u8,
    pub winner: Option<PlayerId>,

    /// Append-only match log.
    pub log: Vector<String>,

    /// Next instance id to mint. Ids below it have been issued.
    pub next_instance_id: InstanceId,

    /// Deal seed.
    pub seed: u64,
}

impl MatchState {
    /// The seat whose turn it is.
    #[must_use]
    pub fn active_seat(&self) -> Seat {
        self.current_player_index
    }

    #[must_use]
    pub fn active_player(&self) -> &PlayerState {
        &self.players[self.current_player_index]
    }

    /// Seat of a player id, if the player is in this match.
    #[must_use]
    pub fn seat_of(&self, player: &PlayerId) -> Option<Seat> {
        self.players.position(|p| p.id == *player)
    }

    #[must_use]
    pub fn is_turn_of(&self, player: &PlayerId) -> bool {
        self.active_player().id == *player
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Actions left in the current turn.
    #[must_use]
    pub fn actions_remaining(&self) -> u8 {
        self.actions_per_turn.saturating_sub(self.actions_taken_this_turn)
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log.push_back(line.into());
    }

    /// Log lines with combat lines where nothing got through filtered out.
    pub fn visible_log(&self) -> impl Iterator<Item = &String> {
        self.log.iter().filter(|line| !line.contains(ABSORBED_LOG_MARKER))
    }

    /// Issue a fresh instance id.
    pub fn mint_instance_id(&mut self) -> InstanceId {
        let id = self.next_instance_id;
        self.next_instance_id = id.next();
        id
    }

    /// Every instance id in market, hands and fields.
    pub fn instance_ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        let market = self.market.iter();
        let hands = self.players.iter().flat_map(|(_, p)| p.hand.iter());
        let fields = self.players.iter().flat_map(|(_, p)| p.field_knowledge());
        market.chain(hands).chain(fields).map(|k| k.instance_id)
    }

    /// Canonical binary encoding, for exact comparisons.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Check the structural invariants every reachable state satisfies.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.actions_taken_this_turn > self.actions_per_turn {
            return Err(InvariantViolation::BudgetExceeded {
                taken: self.actions_taken_this_turn,
                budget: self.actions_per_turn,
            });
        }

        if self.winner.is_some() && self.phase != Phase::End {
            return Err(InvariantViolation::WinnerOutsideEndPhase(self.phase));
        }

        let mut seen = FxHashSet::default();
        for id in self.instance_ids() {
            if !seen.insert(id) {
                return Err(InvariantViolation::DuplicateInstance(id));
            }
            if id >= self.next_instance_id {
                return Err(InvariantViolation::UnmintedInstance(id));
            }
        }

        for (seat, player) in self.players.iter() {
            let aligned = player.creatures.len() == player.field.len()
                && player
                    .creatures
                    .iter()
                    .zip(player.field.iter())
                    .all(|(c, slot)| c.id == slot.creature_id);
            if !aligned {
                return Err(InvariantViolation::FieldMisaligned(seat));
            }

            let rotations = player
                .creatures
                .iter()
                .map(|c| c.rotation)
                .chain(player.field_knowledge().map(|k| k.rotation));
            for rotation in rotations {
                if rotation % ROTATION_STEP != 0 || rotation >= FULL_ROTATION {
                    return Err(InvariantViolation::BadRotation { seat, rotation });
                }
            }
        }

        Ok(())
    }
}

/// A structural invariant that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{taken} actions taken with a budget of {budget}")]
    BudgetExceeded { taken: u8, budget: u8 },

    #[error("winner set while phase is {0}")]
    WinnerOutsideEndPhase(Phase),

    #[error("instance {0} appears more than once")]
    DuplicateInstance(InstanceId),

    #[error("instance {0} was never minted")]
    UnmintedInstance(InstanceId),

    #[error("{0}: field slots do not follow creature order")]
    FieldMisaligned(Seat),

    #[error("{seat}: rotation {rotation} is not a quarter turn")]
    BadRotation { seat: Seat, rotation: u16 },
}
