//! The action dispatcher.
//!
//! ## Commit Protocol
//!
//! 1. Claim the in-flight slot, or return `Busy` (never queued)
//! 2. Validate against the current local state
//! 3. Reduce to the next state
//! 4. Write the next state to the store (the commit point)
//! 5. Append the audit record and publish the new local state
//!
//! A failed write leaves the local state and the history untouched, so an
//! action either lands completely or not at all.
//!
//! ## Remote Snapshots
//!
//! `apply_remote` (and `SET_STATE` through `handle`) replaces the local
//! state wholesale without validation, persistence or auditing: the snapshot
//! already lives in the store. Any snapshot written by someone else wins,
//! whatever it contains.
//!
//! The one exception is the echo of this client's own earlier write while a
//! newer write of its own has not echoed back yet. The feed delivers writes
//! in order, so the newer echo is still coming; applying the older one would
//! roll back a committed move in the meantime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use im::Vector;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::DispatchError;
use crate::core::{Action, ActionRecord, MatchId, MatchState};
use crate::rules::{MatchRules, MatchSetup};
use crate::store::{self, RecordStore};

/// Something that accepts actions on behalf of a player.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn submit(&self, action: Action) -> Result<(), DispatchError>;
}

/// Releases the in-flight slot when dropped, including on cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One client's gateway to one match.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use ccg_duel::core::{Action, MatchId, Phase, PlayerId};
/// use ccg_duel::dispatch::ActionDispatcher;
/// use ccg_duel::rules::{MatchRules, MatchSetup};
/// use ccg_duel::store::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = Arc::new(MemoryStore::new());
/// let setup = MatchSetup::standard(MatchId::new("m-1"), PlayerId::new("alice"), PlayerId::new("bob"));
/// let dispatcher = ActionDispatcher::open(store.clone(), Arc::new(MatchRules::standard()), &setup)
///     .await
///     .unwrap();
///
/// dispatcher.handle(Action::resolve_knowledge(PlayerId::new("alice"))).await.unwrap();
/// assert_eq!(dispatcher.state().phase, Phase::Action);
/// assert_eq!(store.write_count("m-1"), 2);
/// # });
/// ```
pub struct ActionDispatcher {
    store: Arc<dyn RecordStore>,
    rules: Arc<MatchRules>,
    match_id: MatchId,
    state: watch::Sender<MatchState>,
    history: Mutex<Vector<ActionRecord>>,
    unechoed: Mutex<Vector<MatchState>>,
    in_flight: AtomicBool,
}

/// Own writes remembered while waiting for their echo.
const MAX_UNECHOED: usize = 16;

impl ActionDispatcher {
    /// Wrap an existing state. Nothing is written.
    #[must_use]
    pub fn from_state(store: Arc<dyn RecordStore>, rules: Arc<MatchRules>, state: MatchState) -> Self {
        let match_id = state.match_id.clone();
        let (state, _) = watch::channel(state);
        Self {
            store,
            rules,
            match_id,
            state,
            history: Mutex::new(Vector::new()),
            unechoed: Mutex::new(Vector::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Join a match, creating it if the store has no record yet.
    ///
    /// First writer wins: if the record is missing this client deals and
    /// writes the initial state; otherwise the stored state is adopted.
    pub async fn open(
        store: Arc<dyn RecordStore>,
        rules: Arc<MatchRules>,
        setup: &MatchSetup,
    ) -> Result<Self, DispatchError> {
        let key = setup.match_id.as_str();
        let state = match store::load::<MatchState>(store.as_ref(), key)
            .await
            .map_err(DispatchError::Store)?
        {
            Some(existing) => {
                info!(match_id = %setup.match_id, turn = existing.turn, "joined existing match");
                existing
            }
            None => {
                let fresh = rules.deal(setup);
                store::save(store.as_ref(), key, &fresh)
                    .await
                    .map_err(DispatchError::Store)?;
                info!(match_id = %setup.match_id, seed = fresh.seed, "created match");
                fresh
            }
        };
        Ok(Self::from_state(store, rules, state))
    }

    #[must_use]
    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    #[must_use]
    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Snapshot of the current local state.
    #[must_use]
    pub fn state(&self) -> MatchState {
        self.state.borrow().clone()
    }

    /// Watch local state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<MatchState> {
        self.state.subscribe()
    }

    /// Audit history of actions committed through this dispatcher.
    #[must_use]
    pub fn history(&self) -> Vector<ActionRecord> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validate, reduce, persist and commit one action.
    pub async fn handle(&self, action: Action) -> Result<(), DispatchError> {
        if let Action::SetState { snapshot } = action {
            self.apply_remote(*snapshot);
            return Ok(());
        }

        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            warn!(match_id = %self.match_id, action = %action.kind(), "action rejected: another action is in flight");
            return Err(DispatchError::Busy);
        };

        let current = self.state();
        if let Err(err) = self.rules.validate(&current, &action) {
            debug!(match_id = %self.match_id, action = %action.kind(), error = %err, "action rejected");
            return Err(err.into());
        }
        let next = self.rules.reduce(&current, &action);

        if let Err(err) = store::save(self.store.as_ref(), self.match_id.as_str(), &next).await {
            warn!(match_id = %self.match_id, action = %action.kind(), error = %err, "persist failed");
            return Err(DispatchError::PersistFailure(err));
        }

        if let Some(player) = action.player().cloned() {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            let sequence = u32::try_from(history.len()).unwrap_or(u32::MAX);
            history.push_back(ActionRecord::new(player, action.clone(), current.turn, sequence));
        }
        debug!(
            match_id = %self.match_id,
            action = %action.kind(),
            turn = next.turn,
            seat = next.current_player_index.index(),
            phase = %next.phase,
            "action committed"
        );
        if let Some(winner) = &next.winner {
            info!(match_id = %self.match_id, winner = %winner, "match finished");
        }
        {
            let mut unechoed = self.unechoed.lock().unwrap_or_else(PoisonError::into_inner);
            if unechoed.len() == MAX_UNECHOED {
                unechoed.pop_front();
            }
            unechoed.push_back(next.clone());
        }
        self.state.send_replace(next);
        Ok(())
    }

    /// Replace local state with a snapshot from the store.
    ///
    /// Returns whether the local state changed.
    pub fn apply_remote(&self, snapshot: MatchState) -> bool {
        if snapshot.match_id != self.match_id {
            warn!(
                match_id = %self.match_id,
                other = %snapshot.match_id,
                "ignoring snapshot for another match"
            );
            return false;
        }

        {
            let mut unechoed = self.unechoed.lock().unwrap_or_else(PoisonError::into_inner);
            match unechoed.iter().position(|own| *own == snapshot) {
                Some(index) => {
                    let newer = unechoed.split_off(index + 1);
                    *unechoed = newer;
                    if !unechoed.is_empty() {
                        debug!(
                            match_id = %self.match_id,
                            pending = unechoed.len(),
                            "skipping echo of an earlier own write"
                        );
                        return false;
                    }
                }
                None => unechoed.clear(),
            }
        }

        self.state.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        })
    }
}

#[async_trait]
impl ActionSink for ActionDispatcher {
    async fn submit(&self, action: Action) -> Result<(), DispatchError> {
        self.handle(action).await
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("match_id", &self.match_id)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Phase, PlayerId, Seat};
    use crate::rules::ValidationError;
    use crate::store::MemoryStore;

    fn setup() -> MatchSetup {
        MatchSetup::standard(MatchId::new("d-1"), PlayerId::new("alice"), PlayerId::new("bob"))
    }

    async fn open(store: &Arc<MemoryStore>) -> ActionDispatcher {
        ActionDispatcher::open(store.clone(), Arc::new(MatchRules::standard()), &setup())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_then_joins() {
        let store = Arc::new(MemoryStore::new());
        let first = open(&store).await;
        assert_eq!(store.write_count("d-1"), 1);

        let second = open(&store).await;
        assert_eq!(store.write_count("d-1"), 1);
        assert_eq!(first.state(), second.state());
    }

    #[tokio::test]
    async fn test_accepted_action_writes_once_and_audits() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = open(&store).await;

        dispatcher
            .handle(Action::resolve_knowledge(PlayerId::new("alice")))
            .await
            .unwrap();

        assert_eq!(store.write_count("d-1"), 2);
        let history = dispatcher.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].player, PlayerId::new("alice"));
        assert_eq!(history[0].sequence, 0);
        assert_eq!(history[0].turn, 1);

        let stored: MatchState = serde_json::from_value(store.peek("d-1").unwrap()).unwrap();
        assert_eq!(stored, dispatcher.state());
    }

    #[tokio::test]
    async fn test_rejected_action_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = open(&store).await;
        let before = dispatcher.state().to_bytes().unwrap();

        let err = dispatcher.handle(Action::end_turn(PlayerId::new("bob"))).await.unwrap_err();

        assert_eq!(err, DispatchError::Validation(ValidationError::NotYourTurn(PlayerId::new("bob"))));
        assert_eq!(store.write_count("d-1"), 1);
        assert!(dispatcher.history().is_empty());
        assert_eq!(dispatcher.state().to_bytes().unwrap(), before);
    }

    #[tokio::test]
    async fn test_persist_failure_leaves_state() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = open(&store).await;
        let before = dispatcher.state();

        store.fail_next_sets(1);
        let err = dispatcher
            .handle(Action::resolve_knowledge(PlayerId::new("alice")))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::PersistFailure(_)));
        assert_eq!(dispatcher.state(), before);
        assert!(dispatcher.history().is_empty());
        assert!(!dispatcher.is_busy());

        // The same action goes through once the store recovers.
        dispatcher
            .handle(Action::resolve_knowledge(PlayerId::new("alice")))
            .await
            .unwrap();
        assert_eq!(dispatcher.state().phase, Phase::Action);
    }

    #[tokio::test]
    async fn test_set_state_replaces_without_persisting() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = open(&store).await;

        let rules = MatchRules::standard();
        let remote = rules
            .apply(&dispatcher.state(), &Action::resolve_knowledge(PlayerId::new("alice")))
            .unwrap();
        dispatcher.handle(Action::set_state(remote.clone())).await.unwrap();

        assert_eq!(dispatcher.state(), remote);
        assert_eq!(store.write_count("d-1"), 1);
        assert!(dispatcher.history().is_empty());
    }

    #[tokio::test]
    async fn test_remote_snapshot_for_other_match_ignored() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = open(&store).await;
        let before = dispatcher.state();

        let other = MatchRules::standard().deal(&MatchSetup::standard(
            MatchId::new("d-2"),
            PlayerId::new("alice"),
            PlayerId::new("bob"),
        ));
        assert!(!dispatcher.apply_remote(other));
        assert_eq!(dispatcher.state(), before);
    }

    #[tokio::test]
    async fn test_shorter_snapshot_from_store_wins() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = open(&store).await;
        let earlier = dispatcher.state();

        dispatcher
            .handle(Action::resolve_knowledge(PlayerId::new("alice")))
            .await
            .unwrap();
        assert!(dispatcher.state().log.len() > earlier.log.len());

        // Another writer put the earlier record back.
        store::save(store.as_ref(), "d-1", &earlier).await.unwrap();
        dispatcher.handle(Action::set_state(earlier.clone())).await.unwrap();

        let stored: MatchState = serde_json::from_value(store.peek("d-1").unwrap()).unwrap();
        assert_eq!(dispatcher.state(), earlier);
        assert_eq!(dispatcher.state(), stored);
        assert_eq!(dispatcher.state().phase, Phase::Knowledge);
    }

    #[tokio::test]
    async fn test_own_earlier_echo_skipped_until_newer_arrives() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = open(&store).await;
        let alice = PlayerId::new("alice");
        let fox = dispatcher.state().players[Seat::First].creatures[0].id;

        dispatcher.handle(Action::resolve_knowledge(alice.clone())).await.unwrap();
        let first = dispatcher.state();
        dispatcher.handle(Action::rotate(alice, fox)).await.unwrap();
        let second = dispatcher.state();

        assert!(!dispatcher.apply_remote(first.clone()));
        assert_eq!(dispatcher.state(), second);

        assert!(!dispatcher.apply_remote(second.clone()));
        assert_eq!(dispatcher.state(), second);

        // With every own write echoed, an older record wins again.
        assert!(dispatcher.apply_remote(first.clone()));
        assert_eq!(dispatcher.state(), first);
    }

    #[tokio::test]
    async fn test_state_watch_sees_commits() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = open(&store).await;
        let mut rx = dispatcher.subscribe_state();

        dispatcher
            .handle(Action::resolve_knowledge(PlayerId::new("alice")))
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().phase, Phase::Action);
    }
}
