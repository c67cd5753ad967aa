//! Keeping a local copy of a shared record in step with the store.
//!
//! - `subscribe`: live feed with exponential reconnect and polling fallback
//! - `SyncHandle`: status, manual reconnect, unsubscribe
//! - `SyncConfig`: timing knobs

mod backoff;
mod channel;
mod config;

pub use backoff::Backoff;
pub use channel::{subscribe, ConnectionStatus, SyncHandle, Update, UpdateSource};
pub use config::SyncConfig;
