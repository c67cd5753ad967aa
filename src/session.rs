//! One client's seat at one match.
//!
//! `MatchSession` wires the pieces a client needs:
//!
//! - an `ActionDispatcher` holding the local state
//! - a sync subscription feeding remote snapshots into the dispatcher
//! - a `TurnController` acting on the local state for this player
//!
//! Dropping the session (or calling `close`) stops the subscription and
//! every timer, so nothing fires against a match the client has left.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::core::{Action, MatchId, MatchState, PlayerId};
use crate::dispatch::{ActionDispatcher, ActionSink, DispatchError};
use crate::rules::{MatchRules, MatchSetup, ValidationError};
use crate::store::RecordStore;
use crate::sync::{self, ConnectionStatus, SyncConfig, SyncHandle, Update};
use crate::task::AbortOnDrop;
use crate::turn::{TurnConfig, TurnController};

pub struct MatchSession {
    player: PlayerId,
    dispatcher: Arc<ActionDispatcher>,
    sync: SyncHandle,
    remaining: watch::Receiver<Option<u32>>,
    turn: Option<AbortOnDrop<()>>,
}

impl MatchSession {
    /// Open (or create) the match and start syncing as `player`.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn join(
        store: Arc<dyn RecordStore>,
        rules: Arc<MatchRules>,
        setup: &MatchSetup,
        player: PlayerId,
        sync_config: SyncConfig,
        turn_config: TurnConfig,
    ) -> Result<Self, DispatchError> {
        let dispatcher = Arc::new(ActionDispatcher::open(Arc::clone(&store), rules, setup).await?);
        if dispatcher.state().seat_of(&player).is_none() {
            return Err(ValidationError::UnknownPlayer(player).into());
        }

        let sync = {
            let dispatcher = Arc::clone(&dispatcher);
            sync::subscribe(
                store,
                setup.match_id.as_str(),
                sync_config,
                move |update: Update<MatchState>| {
                    if dispatcher.apply_remote(update.snapshot) {
                        debug!(match_id = %dispatcher.match_id(), source = ?update.source, "remote state applied");
                    }
                },
            )
        };

        let sink: Arc<dyn ActionSink> = Arc::clone(&dispatcher) as Arc<dyn ActionSink>;
        let controller = TurnController::new(player.clone(), turn_config, sink);
        let remaining = controller.remaining_watch();
        let turn = AbortOnDrop::new(tokio::spawn(controller.run(dispatcher.subscribe_state())));

        info!(match_id = %setup.match_id, player = %player, "joined match session");
        Ok(Self {
            player,
            dispatcher,
            sync,
            remaining,
            turn: Some(turn),
        })
    }

    #[must_use]
    pub fn player(&self) -> &PlayerId {
        &self.player
    }

    #[must_use]
    pub fn match_id(&self) -> &MatchId {
        self.dispatcher.match_id()
    }

    /// Submit an intent through the dispatcher.
    pub async fn submit(&self, action: Action) -> Result<(), DispatchError> {
        self.dispatcher.handle(action).await
    }

    #[must_use]
    pub fn state(&self) -> MatchState {
        self.dispatcher.state()
    }

    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<MatchState> {
        self.dispatcher.subscribe_state()
    }

    #[must_use]
    pub fn is_my_turn(&self) -> bool {
        self.state().is_turn_of(&self.player)
    }

    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.sync.status()
    }

    #[must_use]
    pub fn connection_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.sync.status_watch()
    }

    /// Leave polling or lost sync and try the live feed again.
    pub fn reconnect(&self) {
        self.sync.reconnect();
    }

    /// Seconds left on my turn, if my timer is running.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u32> {
        *self.remaining.borrow()
    }

    #[must_use]
    pub fn remaining_watch(&self) -> watch::Receiver<Option<u32>> {
        self.remaining.clone()
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<ActionDispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.turn.is_some()
    }

    /// Stop syncing and cancel the turn timer.
    pub fn close(&mut self) {
        self.sync.unsubscribe();
        if self.turn.take().is_some() {
            info!(match_id = %self.dispatcher.match_id(), player = %self.player, "left match session");
        }
    }
}

impl std::fmt::Debug for MatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchSession")
            .field("player", &self.player)
            .field("match_id", self.match_id())
            .field("status", &self.connection_status())
            .finish_non_exhaustive()
    }
}
