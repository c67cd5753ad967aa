//! Turn controller integration tests.
//!
//! A controller is wired to a real dispatcher over an in-memory store and
//! driven by the dispatcher's state watch, the way a client runs it.

use std::sync::Arc;
use std::time::Duration;

use ccg_duel::core::{Action, ActionKind, MatchId, Phase, PlayerId, Seat};
use ccg_duel::dispatch::ActionDispatcher;
use ccg_duel::rules::{MatchRules, MatchSetup};
use ccg_duel::store::MemoryStore;
use ccg_duel::turn::{TurnConfig, TurnController};
use tokio::sync::watch;
use tokio::task::JoinHandle;

fn alice() -> PlayerId {
    PlayerId::new("alice")
}

fn bob() -> PlayerId {
    PlayerId::new("bob")
}

struct Client {
    dispatcher: Arc<ActionDispatcher>,
    remaining: watch::Receiver<Option<u32>>,
    task: JoinHandle<()>,
}

impl Drop for Client {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn open(store: &Arc<MemoryStore>, match_id: &str) -> Arc<ActionDispatcher> {
    let setup = MatchSetup::standard(MatchId::new(match_id), alice(), bob());
    Arc::new(
        ActionDispatcher::open(store.clone(), Arc::new(MatchRules::standard()), &setup)
            .await
            .unwrap(),
    )
}

async fn client(match_id: &str, config: TurnConfig) -> Client {
    let store = Arc::new(MemoryStore::new());
    drive(open(&store, match_id).await, config)
}

/// Run a controller for alice against `dispatcher`.
fn drive(dispatcher: Arc<ActionDispatcher>, config: TurnConfig) -> Client {
    let controller = TurnController::new(alice(), config, dispatcher.clone());
    let remaining = controller.remaining_watch();
    let task = tokio::spawn(controller.run(dispatcher.subscribe_state()));
    Client {
        dispatcher,
        remaining,
        task,
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn kinds(dispatcher: &ActionDispatcher) -> Vec<ActionKind> {
    dispatcher.history().iter().map(|r| r.action.kind()).collect()
}

// =============================================================================
// Automatic Turn Actions
// =============================================================================

/// Two action-phase moves exhaust the budget and end the turn automatically.
#[tokio::test(start_paused = true)]
async fn test_exhausted_budget_ends_turn() {
    let client = client("auto-end", TurnConfig::default()).await;
    advance(10).await;
    assert_eq!(client.dispatcher.state().phase, Phase::Action);

    let state = client.dispatcher.state();
    let fox = state.players[Seat::First].creatures[0].id;
    let owl = state.players[Seat::First].creatures[1].id;
    client.dispatcher.handle(Action::rotate(alice(), fox)).await.unwrap();
    client.dispatcher.handle(Action::rotate(alice(), owl)).await.unwrap();
    advance(10).await;

    let state = client.dispatcher.state();
    assert_eq!(state.current_player_index, Seat::Second);
    assert_eq!(state.phase, Phase::Knowledge);
    assert_eq!(state.actions_taken_this_turn, 0);
    assert_eq!(
        kinds(&client.dispatcher),
        vec![
            ActionKind::ResolveKnowledge,
            ActionKind::RotateCreature,
            ActionKind::RotateCreature,
            ActionKind::EndTurn,
        ]
    );
    assert_eq!(*client.remaining.borrow(), None);
}

/// An idle turn ends when the countdown reaches zero.
#[tokio::test(start_paused = true)]
async fn test_countdown_expiry_ends_turn() {
    let client = client("expiry", TurnConfig::default().with_turn_seconds(10)).await;
    advance(10).await;
    assert_eq!(*client.remaining.borrow(), Some(10));

    advance(4_000).await;
    assert_eq!(*client.remaining.borrow(), Some(6));
    assert_eq!(client.dispatcher.state().current_player_index, Seat::First);

    advance(6_000).await;
    let state = client.dispatcher.state();
    assert_eq!(state.current_player_index, Seat::Second);
    assert_eq!(state.phase, Phase::Knowledge);
    assert_eq!(*client.remaining.borrow(), None);

    // Nothing else fires while it is the opponent's turn.
    advance(60_000).await;
    assert_eq!(
        kinds(&client.dispatcher),
        vec![ActionKind::ResolveKnowledge, ActionKind::EndTurn]
    );
}

/// The countdown restarts from full when my next turn begins.
#[tokio::test(start_paused = true)]
async fn test_countdown_restarts_next_turn() {
    let client = client("restart", TurnConfig::default().with_turn_seconds(10)).await;
    advance(10).await;
    advance(7_000).await;
    assert_eq!(*client.remaining.borrow(), Some(3));

    client.dispatcher.handle(Action::end_turn(alice())).await.unwrap();
    advance(10).await;
    assert_eq!(*client.remaining.borrow(), None);

    client.dispatcher.handle(Action::resolve_knowledge(bob())).await.unwrap();
    client.dispatcher.handle(Action::end_turn(bob())).await.unwrap();
    advance(10).await;

    let state = client.dispatcher.state();
    assert_eq!(state.turn, 2);
    assert_eq!(state.phase, Phase::Action);
    assert_eq!(*client.remaining.borrow(), Some(10));
}

/// A manual END_TURN racing the budget check leaves exactly one END_TURN.
#[tokio::test(start_paused = true)]
async fn test_manual_end_turn_not_doubled() {
    let client = client("manual", TurnConfig::default().with_turn_seconds(5)).await;
    advance(10).await;

    client.dispatcher.handle(Action::end_turn(alice())).await.unwrap();
    advance(30_000).await;

    let ends = kinds(&client.dispatcher)
        .into_iter()
        .filter(|k| *k == ActionKind::EndTurn)
        .count();
    assert_eq!(ends, 1);
}

/// With auto-play disabled the controller only keeps time.
#[tokio::test(start_paused = true)]
async fn test_manual_mode_only_counts_down() {
    let config = TurnConfig::default()
        .with_auto_resolve(false)
        .with_auto_end(false)
        .with_turn_seconds(3);
    let client = client("manual-mode", config).await;
    advance(10).await;

    assert_eq!(client.dispatcher.state().phase, Phase::Knowledge);
    assert_eq!(*client.remaining.borrow(), None);

    client.dispatcher.handle(Action::resolve_knowledge(alice())).await.unwrap();
    advance(10).await;
    assert_eq!(*client.remaining.borrow(), Some(3));

    // The countdown still ends the turn.
    advance(3_000).await;
    assert_eq!(client.dispatcher.state().current_player_index, Seat::Second);
}

// =============================================================================
// Failed Writes
// =============================================================================

/// A knowledge resolution whose write fails is sent again and the turn goes on.
#[tokio::test(start_paused = true)]
async fn test_failed_resolve_write_is_retried() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = open(&store, "flaky-resolve").await;
    store.fail_next_sets(1);

    let client = drive(dispatcher, TurnConfig::default().with_turn_seconds(5));
    advance(1_000).await;

    let state = client.dispatcher.state();
    assert_eq!(state.phase, Phase::Action);
    assert_eq!(kinds(&client.dispatcher), vec![ActionKind::ResolveKnowledge]);
    assert_eq!(*client.remaining.borrow(), Some(5));

    advance(5_000).await;
    assert_eq!(client.dispatcher.state().current_player_index, Seat::Second);
}

/// A timeout END_TURN whose write fails is sent again.
#[tokio::test(start_paused = true)]
async fn test_failed_timeout_write_is_retried() {
    let store = Arc::new(MemoryStore::new());
    let client = drive(open(&store, "flaky-end").await, TurnConfig::default().with_turn_seconds(3));
    advance(10).await;
    assert_eq!(client.dispatcher.state().phase, Phase::Action);

    store.fail_next_sets(1);
    advance(4_000).await;

    let state = client.dispatcher.state();
    assert_eq!(state.current_player_index, Seat::Second);
    assert_eq!(
        kinds(&client.dispatcher),
        vec![ActionKind::ResolveKnowledge, ActionKind::EndTurn]
    );
}
