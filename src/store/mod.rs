//! Persistent record store contract.
//!
//! Matches and rendezvous gates live in a shared document store that both
//! clients read and write. The crate only assumes four operations:
//!
//! - `get`: read a record
//! - `set`: replace a record wholesale (last writer wins)
//! - `merge`: shallow field merge (rendezvous flags only)
//! - `watch`: subscribe to changes of one record
//!
//! A successful `watch` is the subscription ack. Every later write to the
//! key is pushed into the returned feed as the full new document. A feed
//! item that is an `Err`, or a feed that ends, means the transport broke
//! and the subscriber must reconnect.
//!
//! `MemoryStore` implements the contract in process, with fault injection
//! for exercising reconnects and polling.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

/// Change notifications for one record.
pub type ChangeFeed = mpsc::UnboundedReceiver<Result<Value, StoreError>>;

/// Store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("record {key} could not be encoded or decoded: {message}")]
    Codec { key: String, message: String },

    #[error("change feed for {0} closed")]
    FeedClosed(String),
}

/// A shared JSON document store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Merge top-level fields into the record, creating it if missing.
    async fn merge(&self, key: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    async fn watch(&self, key: &str) -> Result<ChangeFeed, StoreError>;
}

/// Read and decode a record.
pub async fn load<T: DeserializeOwned>(
    store: &dyn RecordStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(value) => decode(key, value).map(Some),
        None => Ok(None),
    }
}

/// Encode and write a record.
pub async fn save<T: Serialize + Sync>(
    store: &dyn RecordStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, value).await
}

/// Decode a document pulled from a feed or a read.
pub fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryStore::new();
        let note = Note {
            text: "hello".into(),
        };

        save(&store, "n", &note).await.unwrap();
        let back: Option<Note> = load(&store, "n").await.unwrap();
        assert_eq!(back, Some(note));

        let missing: Option<Note> = load(&store, "other").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_load_wrong_shape_is_codec_error() {
        let store = MemoryStore::new();
        store.set("n", serde_json::json!([1, 2, 3])).await.unwrap();

        let result: Result<Option<Note>, _> = load(&store, "n").await;
        assert!(matches!(result, Err(StoreError::Codec { .. })));
    }
}
