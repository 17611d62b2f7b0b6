use async_trait::async_trait;
use quiz_core::model::{ChapterId, HistoryStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::document;

/// Key under which the whole history document is stored.
pub const HISTORY_KEY: &str = "quiz_history";

/// Key under which a chapter's cached shuffle permutation is stored.
#[must_use]
pub fn shuffle_order_key(chapter: ChapterId) -> String {
    format!("chapter_{chapter}_shuffled_order")
}

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported document version {found} (newest known: {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },
}

/// Origin-scoped string key-value store.
///
/// Values are opaque strings; callers own the encoding. There is no
/// compare-and-swap: the last `set` for a key wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// The history document, read and written whole under [`HISTORY_KEY`].
#[derive(Clone)]
pub struct HistoryRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl HistoryRepository {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load the document, `None` when nothing has been written yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the stored JSON cannot be decoded.
    pub async fn load(&self) -> Result<Option<HistoryStore>, StorageError> {
        match self.kv.get(HISTORY_KEY).await? {
            Some(raw) => document::decode_history(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Overwrite the stored document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save(&self, store: &HistoryStore) -> Result<(), StorageError> {
        let raw = document::encode_history(store)?;
        self.kv.set(HISTORY_KEY, &raw).await
    }

    /// Remove the document entirely.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.kv.remove(HISTORY_KEY).await
    }
}

/// Cached per-chapter shuffle permutations.
#[derive(Clone)]
pub struct ShuffleOrderRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl ShuffleOrderRepository {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Read the cached index order for a chapter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored value is not an index array.
    pub async fn load(&self, chapter: ChapterId) -> Result<Option<Vec<usize>>, StorageError> {
        let Some(raw) = self.kv.get(&shuffle_order_key(chapter)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Store the index order for a chapter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    pub async fn save(&self, chapter: ChapterId, order: &[usize]) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(order).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(&shuffle_order_key(chapter), &raw).await
    }

    /// Forget the cached order so the next shuffled load draws a new one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    pub async fn clear(&self, chapter: ChapterId) -> Result<(), StorageError> {
        self.kv.remove(&shuffle_order_key(chapter)).await
    }
}

/// Aggregates the store and the typed repositories built on it.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
    pub history: HistoryRepository,
    pub shuffle_orders: ShuffleOrderRepository,
}

impl Storage {
    #[must_use]
    pub fn from_store(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            history: HistoryRepository::new(Arc::clone(&kv)),
            shuffle_orders: ShuffleOrderRepository::new(Arc::clone(&kv)),
            kv,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryRepository::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerMap, ChapterProgress};
    use quiz_core::time::fixed_now;

    #[tokio::test]
    async fn in_memory_store_overwrites_and_removes() {
        let repo = InMemoryRepository::new();
        repo.set("k", "1").await.unwrap();
        repo.set("k", "2").await.unwrap();
        assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("2"));

        repo.remove("k").await.unwrap();
        repo.remove("k").await.unwrap();
        assert_eq!(repo.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn history_round_trips_through_store() {
        let storage = Storage::in_memory();
        assert!(storage.history.load().await.unwrap().is_none());

        let mut store = HistoryStore::default();
        let chapter = ChapterId::new(2);
        store.chapter_progress.insert(
            chapter,
            ChapterProgress::compute(chapter, AnswerMap::new(), 0, 5, |_| None, fixed_now()),
        );
        storage.history.save(&store).await.unwrap();

        let loaded = storage.history.load().await.unwrap().unwrap();
        assert_eq!(loaded, store);

        storage.history.clear().await.unwrap();
        assert!(storage.kv.get(HISTORY_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn shuffle_orders_are_scoped_per_chapter() {
        let storage = Storage::in_memory();
        storage
            .shuffle_orders
            .save(ChapterId::new(1), &[2, 0, 1])
            .await
            .unwrap();

        assert_eq!(
            storage.shuffle_orders.load(ChapterId::new(1)).await.unwrap(),
            Some(vec![2, 0, 1])
        );
        assert_eq!(storage.shuffle_orders.load(ChapterId::new(2)).await.unwrap(), None);
        assert_eq!(
            storage
                .kv
                .get("chapter_1_shuffled_order")
                .await
                .unwrap()
                .as_deref(),
            Some("[2,0,1]")
        );
    }

    #[tokio::test]
    async fn garbage_shuffle_order_is_a_serialization_error() {
        let storage = Storage::in_memory();
        storage
            .kv
            .set(&shuffle_order_key(ChapterId::new(3)), "not json")
            .await
            .unwrap();
        let err = storage
            .shuffle_orders
            .load(ChapterId::new(3))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
