//! Turn timer and automatic turn actions.

mod config;
mod controller;

pub use config::TurnConfig;
pub use controller::TurnController;
