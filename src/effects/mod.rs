//! Effect system for knowledge cards.
//!
//! - `EffectHandler`: hooks a card tag into the match (entry, tick, combat, completion)
//! - `EffectRegistry`: handlers keyed by `EffectTag`
//! - `CombatResolver`: turns raw damage into a `Strike`
//!
//! ## Design Philosophy
//!
//! Card behavior is data plus a registry lookup, not a type hierarchy. A
//! template names its tag; the reducer asks the registry for the handler and
//! calls the hook for the moment at hand. New cards with existing behavior
//! need no code; new behavior needs one handler registered under a new tag.

mod handler;
mod registry;
mod combat;

pub use handler::{DrainEffect, EffectContext, EffectHandler, FinalEffect, MendEffect, StrikeEffect};
pub use registry::EffectRegistry;
pub use combat::{CombatResolver, DefaultCombat, Strike};
