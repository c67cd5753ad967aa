//! Core match types: identifiers, seats, state, actions, RNG, configuration.
//!
//! Everything here is plain data. Rules live in `rules`, I/O in `store`,
//! `dispatch` and `sync`.

pub mod entity;
pub mod player;
pub mod rng;
pub mod config;
pub mod action;
pub mod state;

pub use entity::{CreatureId, InstanceId, MatchId, TemplateId};
pub use player::{PlayerId, Seat, Seats};
pub use rng::GameRng;
pub use config::{MatchConfig, CREATURES_PER_PLAYER};
pub use action::{Action, ActionKind, ActionRecord};
pub use state::{
    Creature, FieldSlot, InvariantViolation, MatchState, Phase, PlayerState,
    ABSORBED_LOG_MARKER, FULL_ROTATION, READY_ROTATION, ROTATION_STEP,
};
