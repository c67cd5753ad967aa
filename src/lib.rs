//! # ccg-duel
//!
//! Match state machine and client synchronization for a two-player card
//! battle.
//!
//! ## Design Principles
//!
//! 1. **Pure Rules**: `MatchRules::reduce` is a function of (state, action).
//!    No I/O, no clock, no randomness after the seeded deal.
//!
//! 2. **One Writer Per Client**: every local mutation goes through one
//!    `ActionDispatcher`, one action at a time.
//!
//! 3. **Whole Snapshots**: the store holds the full match record; clients
//!    replace their local view wholesale and never patch it.
//!
//! ## Architecture
//!
//! - **Persistent Data Structures**: `im` vectors keep state clones cheap,
//!   so every reduction returns a fresh value.
//!
//! - **Owned Tasks**: subscriptions, polls and timers run as tokio tasks
//!   owned by handles that abort them on drop.
//!
//! ## Modules
//!
//! - `core`: ids, seats, match state, actions, RNG, configuration
//! - `cards`: knowledge templates, instances and the catalog
//! - `effects`: effect handlers and combat resolution
//! - `rules`: validation, reduction and the initial deal
//! - `store`: the shared record store contract and an in-memory store
//! - `sync`: live subscription with reconnect and polling fallback
//! - `dispatch`: the single-flight action gateway
//! - `turn`: turn timer and automatic turn actions
//! - `rendezvous`: two-party readiness gate
//! - `session`: one client wired end to end

pub mod core;
pub mod cards;
pub mod effects;
pub mod rules;
pub mod store;
pub mod sync;
pub mod dispatch;
pub mod turn;
pub mod rendezvous;
pub mod session;

mod task;

// Re-export commonly used types
pub use crate::core::{
    Action, ActionKind, ActionRecord,
    CreatureId, InstanceId, MatchId, TemplateId,
    PlayerId, Seat, Seats,
    GameRng, MatchConfig,
    Creature, FieldSlot, MatchState, Phase, PlayerState,
};

pub use crate::cards::{EffectTag, KnowledgeInstance, KnowledgeRegistry, KnowledgeTemplate};

pub use crate::effects::{CombatResolver, DefaultCombat, EffectHandler, EffectRegistry, Strike};

pub use crate::rules::{MatchRules, MatchSetup, PlayerSetup, ValidationError};

pub use crate::store::{MemoryStore, RecordStore, StoreError};

pub use crate::sync::{ConnectionStatus, SyncConfig, SyncHandle};

pub use crate::dispatch::{ActionDispatcher, ActionSink, DispatchError};

pub use crate::turn::{TurnConfig, TurnController};

pub use crate::rendezvous::{RendezvousCoordinator, RendezvousError, RendezvousHandle};

pub use crate::session::MatchSession;
