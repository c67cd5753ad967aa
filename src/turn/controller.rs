//! Per-client turn timer.
//!
//! The controller watches the local match state and acts for its player:
//!
//! - my turn, knowledge phase: send `RESOLVE_KNOWLEDGE` once per turn
//! - my turn, action phase: count down `turn_seconds`, then send `END_TURN`
//! - action budget used up: send `END_TURN` right away
//!
//! A turn is identified by `(turn, seat)`. The countdown restarts only when
//! that key changes, and each countdown carries one fired flag shared by the
//! timer and the budget check, so a turn is ended at most once from here.
//! Only the client whose turn it is runs a timer.
//!
//! Busy and persist failures are retried a bounded number of times. If the
//! retries run out, the claim on that action is released and the next state
//! change for the same turn tries again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::config::TurnConfig;
use crate::core::{Action, MatchState, Phase, PlayerId, Seat};
use crate::dispatch::ActionSink;
use crate::task::AbortOnDrop;

type TurnKey = (u32, Seat);

struct Countdown {
    key: TurnKey,
    fired: Arc<AtomicBool>,
    task: AbortOnDrop<()>,
}

impl Countdown {
    /// Has the timer run out?
    fn expired(&self) -> bool {
        self.task.is_finished()
    }
}

/// Drives automatic turn actions for one player.
pub struct TurnController {
    player: PlayerId,
    config: TurnConfig,
    sink: Arc<dyn ActionSink>,
    remaining: Arc<watch::Sender<Option<u32>>>,
    countdown: Option<Countdown>,
    resolving: Option<(TurnKey, Arc<AtomicBool>)>,
    submissions: Vec<AbortOnDrop<()>>,
}

impl TurnController {
    #[must_use]
    pub fn new(player: PlayerId, config: TurnConfig, sink: Arc<dyn ActionSink>) -> Self {
        let (remaining, _) = watch::channel(None);
        Self {
            player,
            config,
            sink,
            remaining: Arc::new(remaining),
            countdown: None,
            resolving: None,
            submissions: Vec::new(),
        }
    }

    #[must_use]
    pub fn player(&self) -> &PlayerId {
        &self.player
    }

    /// Seconds left on my turn; `None` while no timer runs.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        *self.remaining.borrow()
    }

    #[must_use]
    pub fn remaining_watch(&self) -> watch::Receiver<Option<u32>> {
        self.remaining.subscribe()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.countdown.is_some()
    }

    /// React to a new local state. Must be called from within a tokio runtime.
    pub fn observe(&mut self, state: &MatchState) {
        let key = (state.turn, state.current_player_index);
        if state.is_finished() || !state.is_turn_of(&self.player) {
            self.stop();
            return;
        }

        match state.phase {
            Phase::Knowledge => {
                self.stop();
                if !self.config.auto_resolve_knowledge {
                    return;
                }
                let claim = match &self.resolving {
                    Some((resolving, claim)) if *resolving == key => Arc::clone(claim),
                    _ => {
                        let claim = Arc::new(AtomicBool::new(false));
                        self.resolving = Some((key, Arc::clone(&claim)));
                        claim
                    }
                };
                if !claim.swap(true, Ordering::AcqRel) {
                    debug!(player = %self.player, turn = state.turn, "resolving knowledge");
                    self.spawn_submit(Action::resolve_knowledge(self.player.clone()), claim);
                }
            }
            Phase::Action => {
                if self.countdown.as_ref().map(|c| c.key) != Some(key) {
                    self.start(key);
                }
                let Some(countdown) = &self.countdown else {
                    return;
                };
                let exhausted = self.config.auto_end_on_exhausted_budget && state.actions_remaining() == 0;
                if (exhausted || countdown.expired()) && !countdown.fired.swap(true, Ordering::AcqRel) {
                    let fired = Arc::clone(&countdown.fired);
                    if exhausted {
                        info!(player = %self.player, turn = state.turn, "action budget used, ending turn");
                    } else {
                        info!(player = %self.player, turn = state.turn, "turn timer expired, ending turn");
                    }
                    self.spawn_submit(Action::end_turn(self.player.clone()), fired);
                }
            }
            Phase::End => self.stop(),
        }
    }

    /// Drive the controller from a state watch until the sender goes away.
    pub async fn run(mut self, mut states: watch::Receiver<MatchState>) {
        loop {
            let state = states.borrow_and_update().clone();
            self.observe(&state);
            if states.changed().await.is_err() {
                break;
            }
        }
        self.stop();
    }

    /// Cancel the countdown, if any.
    pub fn stop(&mut self) {
        if self.countdown.take().is_some() {
            debug!(player = %self.player, "turn timer stopped");
        }
        self.remaining.send_replace(None);
    }

    fn start(&mut self, key: TurnKey) {
        let fired = Arc::new(AtomicBool::new(false));
        let seconds = self.config.turn_seconds;
        self.remaining.send_replace(Some(seconds));
        debug!(player = %self.player, turn = key.0, seconds, "turn timer started");

        let task = tokio::spawn(count_down(
            seconds,
            Arc::clone(&fired),
            Arc::clone(&self.remaining),
            Arc::clone(&self.sink),
            self.player.clone(),
            self.config.clone(),
        ));
        self.countdown = Some(Countdown {
            key,
            fired,
            task: AbortOnDrop::new(task),
        });
    }

    /// Submit in the background; `claim` is released if every attempt fails.
    fn spawn_submit(&mut self, action: Action, claim: Arc<AtomicBool>) {
        self.submissions.retain(|task| !task.is_finished());
        let sink = Arc::clone(&self.sink);
        let config = self.config.clone();
        let task = tokio::spawn(async move {
            if !submit_with_retry(sink, action, config).await {
                claim.store(false, Ordering::Release);
            }
        });
        self.submissions.push(AbortOnDrop::new(task));
    }
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("player", &self.player)
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}

async fn count_down(
    seconds: u32,
    fired: Arc<AtomicBool>,
    remaining: Arc<watch::Sender<Option<u32>>>,
    sink: Arc<dyn ActionSink>,
    player: PlayerId,
    config: TurnConfig,
) {
    for left in (0..seconds).rev() {
        tokio::time::sleep(Duration::from_secs(1)).await;
        remaining.send_replace(Some(left));
    }
    if fired.swap(true, Ordering::AcqRel) {
        return;
    }
    info!(player = %player, "turn timer expired, ending turn");
    if !submit_with_retry(sink, Action::end_turn(player), config).await {
        fired.store(false, Ordering::Release);
    }
}

/// Returns whether the action went through.
async fn submit_with_retry(sink: Arc<dyn ActionSink>, action: Action, config: TurnConfig) -> bool {
    let mut retries = 0;
    loop {
        match sink.submit(action.clone()).await {
            Ok(()) => return true,
            Err(err) if err.is_transient() && retries < config.retries => {
                retries += 1;
                debug!(action = %action.kind(), retries, error = %err, "automatic action failed, retrying");
                tokio::time::sleep(config.retry_delay()).await;
            }
            Err(err) => {
                warn!(action = %action.kind(), error = %err, "automatic action failed");
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MatchId;
    use crate::dispatch::DispatchError;
    use crate::rules::{MatchRules, MatchSetup};
    use crate::store::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records submissions; answers `Busy` for the first `busy` calls and
    /// `PersistFailure` for the next `unpersisted` calls.
    #[derive(Default)]
    struct RecordingSink {
        submitted: Mutex<Vec<Action>>,
        busy: Mutex<u32>,
        unpersisted: Mutex<u32>,
    }

    #[async_trait]
    impl ActionSink for RecordingSink {
        async fn submit(&self, action: Action) -> Result<(), DispatchError> {
            {
                let mut busy = self.busy.lock().unwrap();
                if *busy > 0 {
                    *busy -= 1;
                    return Err(DispatchError::Busy);
                }
            }
            {
                let mut unpersisted = self.unpersisted.lock().unwrap();
                if *unpersisted > 0 {
                    *unpersisted -= 1;
                    return Err(DispatchError::PersistFailure(StoreError::Unavailable("offline".into())));
                }
            }
            self.submitted.lock().unwrap().push(action);
            Ok(())
        }
    }

    impl RecordingSink {
        fn actions(&self) -> Vec<Action> {
            self.submitted.lock().unwrap().clone()
        }
    }

    fn alice() -> PlayerId {
        PlayerId::new("alice")
    }

    fn knowledge_phase() -> MatchState {
        MatchRules::standard().deal(&MatchSetup::standard(MatchId::new("t"), alice(), PlayerId::new("bob")))
    }

    fn action_phase() -> MatchState {
        MatchRules::standard()
            .apply(&knowledge_phase(), &Action::resolve_knowledge(alice()))
            .unwrap()
    }

    fn controller(sink: &Arc<RecordingSink>, config: TurnConfig) -> TurnController {
        TurnController::new(alice(), config, sink.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_fires_end_turn_once() {
        let sink = Arc::new(RecordingSink::default());
        let mut turn = controller(&sink, TurnConfig::default().with_turn_seconds(3));
        let state = action_phase();

        turn.observe(&state);
        assert_eq!(turn.remaining(), Some(3));

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(turn.remaining(), Some(2));

        tokio::time::sleep(Duration::from_secs(5)).await;
        turn.observe(&state);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(sink.actions(), vec![Action::end_turn(alice())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timer_on_opponent_turn() {
        let sink = Arc::new(RecordingSink::default());
        let mut turn = TurnController::new(PlayerId::new("bob"), TurnConfig::default(), sink.clone());

        turn.observe(&action_phase());
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(!turn.is_running());
        assert_eq!(turn.remaining(), None);
        assert!(sink.actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_ends_turn_immediately() {
        let sink = Arc::new(RecordingSink::default());
        let mut turn = controller(&sink, TurnConfig::default().with_turn_seconds(5));
        let mut state = action_phase();
        state.actions_taken_this_turn = state.actions_per_turn;

        turn.observe(&state);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sink.actions(), vec![Action::end_turn(alice())]);

        // The countdown shares the fired flag and stays quiet.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.actions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_knowledge_once_per_turn() {
        let sink = Arc::new(RecordingSink::default());
        let mut turn = controller(&sink, TurnConfig::default());
        let state = knowledge_phase();

        turn.observe(&state);
        turn.observe(&state);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(sink.actions(), vec![Action::resolve_knowledge(alice())]);
        assert!(!turn.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_behaviours_can_be_disabled() {
        let sink = Arc::new(RecordingSink::default());
        let config = TurnConfig::default().with_auto_resolve(false).with_auto_end(false);
        let mut turn = controller(&sink, config);

        turn.observe(&knowledge_phase());
        let mut state = action_phase();
        state.actions_taken_this_turn = state.actions_per_turn;
        turn.observe(&state);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(sink.actions().is_empty());
        assert_eq!(turn.remaining(), Some(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_is_retried() {
        let sink = Arc::new(RecordingSink::default());
        *sink.busy.lock().unwrap() = 2;
        let mut turn = controller(&sink, TurnConfig::default());

        turn.observe(&knowledge_phase());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(sink.actions(), vec![Action::resolve_knowledge(alice())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_failure_is_retried() {
        let sink = Arc::new(RecordingSink::default());
        *sink.unpersisted.lock().unwrap() = 1;
        let mut turn = controller(&sink, TurnConfig::default());

        turn.observe(&knowledge_phase());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(sink.actions(), vec![Action::resolve_knowledge(alice())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_released_when_retries_run_out() {
        let sink = Arc::new(RecordingSink::default());
        *sink.unpersisted.lock().unwrap() = 2;
        let config = TurnConfig::default().with_retries(1, Duration::from_millis(100));
        let mut turn = controller(&sink, config);
        let state = knowledge_phase();

        turn.observe(&state);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(sink.actions().is_empty());

        // The same turn is claimable again.
        turn.observe(&state);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.actions(), vec![Action::resolve_knowledge(alice())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_timer_ends_turn_after_failed_attempt() {
        let sink = Arc::new(RecordingSink::default());
        let config = TurnConfig::default()
            .with_turn_seconds(2)
            .with_retries(0, Duration::from_millis(100));
        let mut turn = controller(&sink, config);
        let state = action_phase();

        turn.observe(&state);
        *sink.unpersisted.lock().unwrap() = 1;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(sink.actions().is_empty());
        assert_eq!(turn.remaining(), Some(0));

        turn.observe(&state);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sink.actions(), vec![Action::end_turn(alice())]);

        turn.observe(&state);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.actions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_stops_on_winner() {
        let sink = Arc::new(RecordingSink::default());
        let mut turn = controller(&sink, TurnConfig::default().with_turn_seconds(3));
        let mut state = action_phase();

        turn.observe(&state);
        assert!(turn.is_running());

        state.winner = Some(alice());
        state.phase = Phase::End;
        turn.observe(&state);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!turn.is_running());
        assert!(sink.actions().is_empty());
    }
}
