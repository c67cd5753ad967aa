use thiserror::Error;

use crate::rules::ValidationError;
use crate::store::StoreError;

/// Why `ActionDispatcher::handle` did not commit an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The action breaks a rule. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another action is still being committed.
    #[error("another action is still in flight")]
    Busy,

    /// The store rejected the write. Local state is unchanged.
    #[error("failed to persist match state: {0}")]
    PersistFailure(#[source] StoreError),

    /// The match record could not be read or created.
    #[error("failed to open match: {0}")]
    Store(#[source] StoreError),
}

impl DispatchError {
    /// Worth retrying unchanged?
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, DispatchError::Busy | DispatchError::PersistFailure(_))
    }
}
