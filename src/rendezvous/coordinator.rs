//! Rendezvous coordinator.
//!
//! `start` watches the record two ways at once: a live subscription and a
//! backup poll. Either path may see completion first, possibly within the
//! same tick, so the callback sits behind a gate that opens once. After it
//! fires, or after `cancel`, a supervisor task drops the subscription and
//! the poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info};

use super::record::RendezvousRecord;
use super::RendezvousError;
use crate::core::MatchId;
use crate::store::{self, RecordStore};
use crate::sync::{self, SyncConfig, Update};
use crate::task::AbortOnDrop;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateState {
    Waiting,
    Complete,
    Cancelled,
}

type Callback = Box<dyn FnOnce() + Send>;

struct Gate {
    key: String,
    parties: [String; 2],
    claimed: AtomicBool,
    callback: Mutex<Option<Callback>>,
    state: watch::Sender<GateState>,
}

impl Gate {
    fn new(key: String, parties: [String; 2], callback: Callback) -> Self {
        let (state, _) = watch::channel(GateState::Waiting);
        Self {
            key,
            parties,
            claimed: AtomicBool::new(false),
            callback: Mutex::new(Some(callback)),
            state,
        }
    }

    fn observe(&self, record: &RendezvousRecord) {
        if !record.is_complete(&self.parties) || self.claimed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(key = %self.key, "both parties complete");
        let callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(callback) = callback {
            callback();
        }
        self.state.send_replace(GateState::Complete);
    }

    fn cancel(&self) {
        if self.claimed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.callback.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.state.send_replace(GateState::Cancelled);
        debug!(key = %self.key, "rendezvous cancelled");
    }

    fn current(&self) -> GateState {
        *self.state.borrow()
    }
}

/// Detects when both parties have completed a phase.
pub struct RendezvousCoordinator {
    store: Arc<dyn RecordStore>,
    key: String,
    parties: [String; 2],
    config: SyncConfig,
}

impl RendezvousCoordinator {
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        key: impl Into<String>,
        parties: [String; 2],
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            parties,
            config,
        }
    }

    /// A gate scoped to one match, stored at `{match_id}/rendezvous/{gate}`.
    #[must_use]
    pub fn for_match(
        store: Arc<dyn RecordStore>,
        match_id: &MatchId,
        gate: &str,
        parties: [String; 2],
        config: SyncConfig,
    ) -> Self {
        Self::new(store, format!("{match_id}/rendezvous/{gate}"), parties, config)
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn parties(&self) -> &[String; 2] {
        &self.parties
    }

    /// Set `party`'s flag. Repeating it is harmless.
    pub async fn mark_complete(&self, party: &str) -> Result<(), RendezvousError> {
        if !self.parties.iter().any(|p| p == party) {
            return Err(RendezvousError::UnknownParty(party.to_string()));
        }
        let mut fields = Map::new();
        fields.insert(party.to_string(), Value::Bool(true));
        self.store.merge(&self.key, fields).await?;
        info!(key = %self.key, party, "marked complete");
        Ok(())
    }

    /// One-off read of the shared record.
    pub async fn read(&self) -> Result<RendezvousRecord, RendezvousError> {
        let record = store::load(self.store.as_ref(), &self.key).await?;
        Ok(record.unwrap_or_default())
    }

    /// Watch for completion and call `on_both_complete` exactly once.
    ///
    /// Must be called from within a tokio runtime. Dropping the handle
    /// cancels a rendezvous that has not completed yet.
    pub fn start<F>(&self, on_both_complete: F) -> RendezvousHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let gate = Arc::new(Gate::new(
            self.key.clone(),
            self.parties.clone(),
            Box::new(on_both_complete),
        ));

        let mut live = {
            let gate = Arc::clone(&gate);
            sync::subscribe(
                Arc::clone(&self.store),
                self.key.clone(),
                self.config.clone(),
                move |update: Update<RendezvousRecord>| gate.observe(&update.snapshot),
            )
        };
        let poll = AbortOnDrop::new(tokio::spawn(backup_poll(
            Arc::clone(&self.store),
            Arc::clone(&gate),
            self.config.rendezvous_poll(),
        )));

        let mut state = gate.state.subscribe();
        let key = self.key.clone();
        let supervisor = tokio::spawn(async move {
            // The gate outlives this task, so the sender cannot go away.
            let _ = state.wait_for(|s| *s != GateState::Waiting).await;
            live.unsubscribe();
            drop(poll);
            debug!(key = %key, "rendezvous torn down");
        });

        debug!(key = %self.key, "rendezvous started");
        RendezvousHandle {
            gate,
            supervisor: AbortOnDrop::new(supervisor),
        }
    }
}

impl std::fmt::Debug for RendezvousCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendezvousCoordinator")
            .field("key", &self.key)
            .field("parties", &self.parties)
            .finish_non_exhaustive()
    }
}

async fn backup_poll(store: Arc<dyn RecordStore>, gate: Arc<Gate>, interval: Duration) {
    loop {
        match store::load::<RendezvousRecord>(store.as_ref(), &gate.key).await {
            Ok(Some(record)) => gate.observe(&record),
            Ok(None) => {}
            Err(err) => debug!(key = %gate.key, error = %err, "rendezvous poll failed"),
        }
        if gate.current() != GateState::Waiting {
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

/// A running rendezvous.
pub struct RendezvousHandle {
    gate: Arc<Gate>,
    supervisor: AbortOnDrop<()>,
}

impl RendezvousHandle {
    /// Has the callback fired?
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.gate.current() == GateState::Complete
    }

    /// Has teardown finished?
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Wait until the rendezvous completes or is cancelled.
    ///
    /// Returns `true` on completion.
    pub async fn wait(&self) -> bool {
        let mut state = self.gate.state.subscribe();
        let complete = match state.wait_for(|s| *s != GateState::Waiting).await {
            Ok(settled) => *settled == GateState::Complete,
            Err(_) => false,
        };
        complete
    }

    /// Stop watching. The callback will not fire after this returns.
    pub fn cancel(&self) {
        self.gate.cancel();
    }
}

impl Drop for RendezvousHandle {
    fn drop(&mut self) {
        self.gate.cancel();
    }
}

impl std::fmt::Debug for RendezvousHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendezvousHandle")
            .field("key", &self.gate.key)
            .field("state", &self.gate.current())
            .finish()
    }
}
