//! Two-party "both sides ready" gate.
//!
//! Each party marks itself complete with a field merge on a shared record;
//! both watch the record and fire a callback once every flag is set. The
//! same gate serves pre-match selection and any later mid-match checkpoint.

mod coordinator;
mod record;

pub use coordinator::{RendezvousCoordinator, RendezvousHandle};
pub use record::RendezvousRecord;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendezvousError {
    #[error("{0} is not a party to this rendezvous")]
    UnknownParty(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
