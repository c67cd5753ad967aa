//! Live subscription with reconnect and polling fallback.
//!
//! One background task per subscription walks this state machine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//!                     |            |
//!                     v            v (feed error / feed end)
//!               Reconnecting{n} <--+      backoff base * 2^(n-1)
//!                     |
//!                     v (retries exhausted)
//!                  Polling ---(max poll failures)---> Lost
//! ```
//!
//! `reconnect()` moves Reconnecting, Polling and Lost back to Connecting;
//! in Connected it is ignored. `unsubscribe()` stops everything and leaves
//! the channel Disconnected.
//!
//! After every successful connect the record is read once, so writes missed
//! while disconnected are caught up. Snapshots are delivered whole; an
//! unchanged snapshot is delivered only once.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::config::SyncConfig;
use crate::store::{self, ChangeFeed, RecordStore};
use crate::task::AbortOnDrop;

/// Connection state of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Polling,
    /// Polling kept failing; only `reconnect()` leaves this state.
    Lost,
}

impl ConnectionStatus {
    /// Is a live feed established?
    #[must_use]
    pub fn is_live(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

/// Where a snapshot came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateSource {
    Live,
    Poll,
}

/// A delivered snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Update<T> {
    pub snapshot: T,
    pub source: UpdateSource,
}

#[derive(Debug)]
enum Control {
    Reconnect,
}

/// Handle to a running subscription.
///
/// Dropping the handle stops the subscription.
#[derive(Debug)]
pub struct SyncHandle {
    key: String,
    status: Arc<watch::Sender<ConnectionStatus>>,
    control: mpsc::UnboundedSender<Control>,
    task: Option<AbortOnDrop<()>>,
}

impl SyncHandle {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Watch status changes.
    #[must_use]
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Ask for a fresh connect. Ignored while connected or unsubscribed.
    pub fn reconnect(&self) {
        if self.control.send(Control::Reconnect).is_err() {
            debug!(key = %self.key, "reconnect requested on a stopped subscription");
        }
    }

    /// Stop the live feed and any retry or poll timer.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.status.send_replace(ConnectionStatus::Disconnected);
            debug!(key = %self.key, "unsubscribed");
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

/// Subscribe to a record and deliver decoded snapshots to `on_update`.
///
/// Must be called from within a tokio runtime. The callback runs on the
/// subscription task.
pub fn subscribe<T, F>(
    store: Arc<dyn RecordStore>,
    key: impl Into<String>,
    config: SyncConfig,
    on_update: F,
) -> SyncHandle
where
    T: DeserializeOwned + Send + 'static,
    F: FnMut(Update<T>) + Send + 'static,
{
    let key = key.into();
    let (status, _) = watch::channel(ConnectionStatus::Disconnected);
    let status = Arc::new(status);
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    let worker = Worker {
        store,
        key: key.clone(),
        backoff: Backoff::new(config.backoff_base(), config.backoff_max()),
        config,
        on_update,
        status: Arc::clone(&status),
        control: control_rx,
        last: None,
        _record: PhantomData,
    };
    let task = AbortOnDrop::new(tokio::spawn(worker.run()));

    SyncHandle {
        key,
        status,
        control: control_tx,
        task: Some(task),
    }
}

enum Mode {
    /// Fresh connect, retries reset.
    Connect,
    /// The live feed just broke.
    Retry,
    Live(ChangeFeed),
    Poll,
    Lost,
    Stop,
}

/// Outcome of waiting for a timer while listening for control messages.
enum Wait {
    Elapsed,
    Reconnect,
    Closed,
}

struct Worker<T, F> {
    store: Arc<dyn RecordStore>,
    key: String,
    config: SyncConfig,
    backoff: Backoff,
    on_update: F,
    status: Arc<watch::Sender<ConnectionStatus>>,
    control: mpsc::UnboundedReceiver<Control>,
    last: Option<Value>,
    _record: PhantomData<fn() -> T>,
}

impl<T, F> Worker<T, F>
where
    T: DeserializeOwned + Send + 'static,
    F: FnMut(Update<T>) + Send + 'static,
{
    async fn run(mut self) {
        let mut mode = Mode::Connect;
        loop {
            mode = match mode {
                Mode::Connect => self.connect(false).await,
                Mode::Retry => self.connect(true).await,
                Mode::Live(feed) => self.live(feed).await,
                Mode::Poll => self.poll().await,
                Mode::Lost => self.lost().await,
                Mode::Stop => break,
            };
        }
        debug!(key = %self.key, "subscription task finished");
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(key = %self.key, ?previous, ?status, "connection status changed");
        }
    }

    /// Sleep for `delay` unless a control message arrives first.
    async fn wait(&mut self, delay: Duration) -> Wait {
        tokio::select! {
            () = tokio::time::sleep(delay) => Wait::Elapsed,
            msg = self.control.recv() => match msg {
                Some(Control::Reconnect) => Wait::Reconnect,
                None => Wait::Closed,
            },
        }
    }

    async fn connect(&mut self, after_failure: bool) -> Mode {
        let mut failed = after_failure;
        let mut retries = 0;
        if !failed {
            self.set_status(ConnectionStatus::Connecting);
        }

        loop {
            if failed {
                if retries >= self.config.max_retries {
                    warn!(key = %self.key, retries, "reconnect attempts exhausted, falling back to polling");
                    self.set_status(ConnectionStatus::Polling);
                    return Mode::Poll;
                }
                retries += 1;
                self.set_status(ConnectionStatus::Reconnecting { attempt: retries });
                match self.wait(self.backoff.delay(retries)).await {
                    Wait::Elapsed => {}
                    Wait::Reconnect => return Mode::Connect,
                    Wait::Closed => return Mode::Stop,
                }
            }

            match self.store.watch(&self.key).await {
                Ok(feed) => {
                    info!(key = %self.key, "subscribed");
                    self.set_status(ConnectionStatus::Connected);
                    self.catch_up().await;
                    return Mode::Live(feed);
                }
                Err(err) => {
                    warn!(key = %self.key, attempt = retries + 1, error = %err, "subscribe failed");
                    failed = true;
                }
            }
        }
    }

    /// Read the record once after a connect.
    async fn catch_up(&mut self) {
        match self.store.get(&self.key).await {
            Ok(Some(value)) => self.deliver(value, UpdateSource::Live),
            Ok(None) => {}
            Err(err) => debug!(key = %self.key, error = %err, "catch-up read failed"),
        }
    }

    async fn live(&mut self, mut feed: ChangeFeed) -> Mode {
        loop {
            tokio::select! {
                item = feed.recv() => match item {
                    Some(Ok(value)) => self.deliver(value, UpdateSource::Live),
                    Some(Err(err)) => {
                        warn!(key = %self.key, error = %err, "live feed failed");
                        return Mode::Retry;
                    }
                    None => {
                        warn!(key = %self.key, "live feed ended");
                        return Mode::Retry;
                    }
                },
                msg = self.control.recv() => match msg {
                    Some(Control::Reconnect) => {
                        debug!(key = %self.key, "already connected, reconnect ignored");
                    }
                    None => return Mode::Stop,
                },
            }
        }
    }

    async fn poll(&mut self) -> Mode {
        let mut failures = 0;
        loop {
            match self.wait(self.config.poll_interval()).await {
                Wait::Elapsed => {}
                Wait::Reconnect => return Mode::Connect,
                Wait::Closed => return Mode::Stop,
            }

            match self.store.get(&self.key).await {
                Ok(value) => {
                    failures = 0;
                    if let Some(value) = value {
                        self.deliver(value, UpdateSource::Poll);
                    }
                }
                Err(err) => {
                    failures += 1;
                    warn!(key = %self.key, failures, error = %err, "poll failed");
                    if failures >= self.config.max_poll_failures {
                        warn!(key = %self.key, "sync lost");
                        self.set_status(ConnectionStatus::Lost);
                        return Mode::Lost;
                    }
                }
            }
        }
    }

    async fn lost(&mut self) -> Mode {
        match self.control.recv().await {
            Some(Control::Reconnect) => Mode::Connect,
            None => Mode::Stop,
        }
    }

    fn deliver(&mut self, value: Value, source: UpdateSource) {
        if self.last.as_ref() == Some(&value) {
            return;
        }
        let decoded = store::decode::<T>(&self.key, value.clone());
        self.last = Some(value);
        match decoded {
            Ok(snapshot) => (self.on_update)(Update { snapshot, source }),
            Err(err) => warn!(key = %self.key, error = %err, "skipping undecodable record"),
        }
    }
}
