//! Single-flight gateway between intents and the shared match record.
//!
//! `ActionDispatcher` owns one client's view of one match. Every gameplay
//! action goes validate -> reduce -> persist -> commit locally; remote
//! snapshots replace the local view wholesale.

mod dispatcher;
mod error;

pub use dispatcher::{ActionDispatcher, ActionSink};
pub use error::DispatchError;
