//! Knowledge cards: templates, instances, and the catalog registry.
//!
//! ## Key Types
//!
//! - `KnowledgeTemplate`: static card data (cost, effect tag, magnitude, lifetime)
//! - `EffectTag`: key of the effect handler that drives a card
//! - `KnowledgeInstance`: one copy in a match, tracked by `InstanceId`
//! - `KnowledgeRegistry`: template lookup

pub mod definition;
pub mod instance;
pub mod registry;

pub use definition::{EffectTag, KnowledgeTemplate, DEFAULT_LIFETIME};
pub use instance::KnowledgeInstance;
pub use registry::KnowledgeRegistry;
