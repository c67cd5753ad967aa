//! Match rules: validation, reduction and the initial deal.
//!
//! `MatchRules` is the state machine both clients run. It never performs
//! I/O; `dispatch` wraps it with persistence and `turn` drives it from a
//! timer.
//!
//! Phases cycle `knowledge -> action -> knowledge` (next seat) until a
//! winner is set, after which the phase is `end` and every action is
//! rejected.

pub mod engine;
pub mod error;
pub mod setup;

pub use engine::MatchRules;
pub use error::ValidationError;
pub use setup::{CreatureSpec, MatchSetup, PlayerSetup};
