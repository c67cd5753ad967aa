//! In-process record store.
//!
//! Behaves like a realtime document store with one shared copy of every
//! record. Faults can be injected to simulate a flaky backend:
//!
//! - `fail_next_watches` / `fail_next_sets` / `fail_next_gets`: the next N
//!   calls fail with `Unavailable`
//! - `set_offline`: every call fails and live feeds are cut
//! - `drop_watchers`: cut the live feeds of one key

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::debug;

use super::{ChangeFeed, RecordStore, StoreError};

type Watcher = mpsc::UnboundedSender<Result<Value, StoreError>>;

#[derive(Debug, Default)]
struct Faults {
    watches: usize,
    sets: usize,
    gets: usize,
    offline: bool,
}

#[derive(Debug, Default)]
struct Inner {
    records: FxHashMap<String, Value>,
    watchers: FxHashMap<String, Vec<Watcher>>,
    writes: FxHashMap<String, usize>,
    faults: Faults,
}

impl Inner {
    fn take_fault(counter: &mut usize) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }

    fn commit(&mut self, key: &str, value: Value) {
        *self.writes.entry(key.to_string()).or_default() += 1;
        if let Some(watchers) = self.watchers.get_mut(key) {
            watchers.retain(|tx| tx.send(Ok(value.clone())).is_ok());
        }
        self.records.insert(key.to_string(), value);
    }

    fn cut_feeds(&mut self, key: &str) {
        if let Some(watchers) = self.watchers.remove(key) {
            for tx in watchers {
                let _ = tx.send(Err(StoreError::FeedClosed(key.to_string())));
            }
        }
    }
}

/// In-memory `RecordStore`.
///
/// ## Example
///
/// ```
/// use ccg_duel::store::{MemoryStore, RecordStore};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// let mut feed = store.watch("k").await.unwrap();
///
/// store.set("k", serde_json::json!({"n": 1})).await.unwrap();
/// assert_eq!(feed.recv().await.unwrap().unwrap()["n"], 1);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The next `n` `watch` calls fail.
    pub fn fail_next_watches(&self, n: usize) {
        self.lock().faults.watches = n;
    }

    /// The next `n` `set`/`merge` calls fail.
    pub fn fail_next_sets(&self, n: usize) {
        self.lock().faults.sets = n;
    }

    /// The next `n` `get` calls fail.
    pub fn fail_next_gets(&self, n: usize) {
        self.lock().faults.gets = n;
    }

    /// Take the store offline (every call fails, live feeds are cut) or back online.
    pub fn set_offline(&self, offline: bool) {
        let mut inner = self.lock();
        inner.faults.offline = offline;
        if offline {
            let keys: Vec<String> = inner.watchers.keys().cloned().collect();
            for key in keys {
                inner.cut_feeds(&key);
            }
        }
        debug!(offline, "memory store availability changed");
    }

    /// Break every live feed on `key`.
    pub fn drop_watchers(&self, key: &str) {
        self.lock().cut_feeds(key);
    }

    /// Successful writes (`set` and `merge`) to `key` so far.
    #[must_use]
    pub fn write_count(&self, key: &str) -> usize {
        self.lock().writes.get(key).copied().unwrap_or(0)
    }

    /// Live feeds on `key`.
    #[must_use]
    pub fn watcher_count(&self, key: &str) -> usize {
        let mut inner = self.lock();
        match inner.watchers.get_mut(key) {
            Some(watchers) => {
                watchers.retain(|tx| !tx.is_closed());
                watchers.len()
            }
            None => 0,
        }
    }

    /// Current record, bypassing fault injection.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.lock().records.get(key).cloned()
    }

    fn unavailable(what: &str) -> StoreError {
        StoreError::Unavailable(format!("{what} failed"))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut inner = self.lock();
        if inner.faults.offline || Inner::take_fault(&mut inner.faults.gets) {
            return Err(Self::unavailable("get"));
        }
        Ok(inner.records.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.faults.offline || Inner::take_fault(&mut inner.faults.sets) {
            return Err(Self::unavailable("set"));
        }
        inner.commit(key, value);
        Ok(())
    }

    async fn merge(&self, key: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.faults.offline || Inner::take_fault(&mut inner.faults.sets) {
            return Err(Self::unavailable("merge"));
        }
        let mut record = match inner.records.get(key) {
            Some(Value::Object(existing)) => existing.clone(),
            _ => Map::new(),
        };
        record.extend(fields);
        inner.commit(key, Value::Object(record));
        Ok(())
    }

    async fn watch(&self, key: &str) -> Result<ChangeFeed, StoreError> {
        let mut inner = self.lock();
        if inner.faults.offline || Inner::take_fault(&mut inner.faults.watches) {
            return Err(Self::unavailable("watch"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        inner.watchers.entry(key.to_string()).or_default().push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_notifies_watchers() {
        let store = MemoryStore::new();
        let mut a = store.watch("k").await.unwrap();
        let mut b = store.watch("k").await.unwrap();

        store.set("k", json!(1)).await.unwrap();

        assert_eq!(a.recv().await, Some(Ok(json!(1))));
        assert_eq!(b.recv().await, Some(Ok(json!(1))));
        assert_eq!(store.write_count("k"), 1);
    }

    #[tokio::test]
    async fn test_merge_is_shallow() {
        let store = MemoryStore::new();
        store.set("r", json!({"a": true})).await.unwrap();

        let mut fields = Map::new();
        fields.insert("b".into(), json!(true));
        store.merge("r", fields).await.unwrap();

        assert_eq!(store.peek("r"), Some(json!({"a": true, "b": true})));
    }

    #[tokio::test]
    async fn test_fault_injection_counts_down() {
        let store = MemoryStore::new();
        store.fail_next_watches(2);

        assert!(store.watch("k").await.is_err());
        assert!(store.watch("k").await.is_err());
        assert!(store.watch("k").await.is_ok());

        store.fail_next_sets(1);
        assert!(store.set("k", json!(1)).await.is_err());
        assert_eq!(store.write_count("k"), 0);
        assert!(store.set("k", json!(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_offline_cuts_feeds() {
        let store = MemoryStore::new();
        let mut feed = store.watch("k").await.unwrap();

        store.set_offline(true);
        assert!(matches!(feed.recv().await, Some(Err(StoreError::FeedClosed(_)))));
        assert_eq!(feed.recv().await, None);
        assert!(store.get("k").await.is_err());

        store.set_offline(false);
        assert_eq!(store.get("k").await, Ok(None));
    }

    #[tokio::test]
    async fn test_dropped_receivers_are_pruned() {
        let store = MemoryStore::new();
        let feed = store.watch("k").await.unwrap();
        assert_eq!(store.watcher_count("k"), 1);

        drop(feed);
        assert_eq!(store.watcher_count("k"), 0);
    }
}
