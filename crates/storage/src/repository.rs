use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eduplay_core::model::{RecordId, RecordPatch, UserRecord};
use thiserror::Error;

/// Errors surfaced by local storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by the remote document store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote store answered with status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("record not found")]
    NotFound,
}

/// Persistent string key-value store (the device-local cache).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys are `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Remote collection of user documents.
///
/// There is no lookup by email; callers scan `fetch_all`. Writes are plain
/// merges with no compare-and-swap, so two writers patching the same record
/// race and the later patch wins on overlapping fields.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch every user document keyed by record id.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport failure or a non-success status.
    async fn fetch_all(&self) -> Result<BTreeMap<RecordId, UserRecord>, RemoteError>;

    /// Merge `patch` into the record, leaving absent fields untouched.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` unless the store confirms the write.
    async fn patch(&self, id: &RecordId, patch: &RecordPatch) -> Result<(), RemoteError>;

    /// Create a document and return its generated id.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` unless the store confirms the write.
    async fn create(&self, record: &UserRecord) -> Result<RecordId, RemoteError>;
}

/// In-memory key-value store for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
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
        guard.insert(key.to_string(), value.to_string());
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

/// In-memory user directory for tests and prototyping.
///
/// Generated ids are zero-padded counters so map order matches creation order.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    records: Arc<Mutex<BTreeMap<RecordId, UserRecord>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Transport` if the lock is poisoned.
    pub fn insert(&self, id: RecordId, record: UserRecord) -> Result<(), RemoteError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        guard.insert(id, record);
        Ok(())
    }

    /// Snapshot a single record.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Transport` if the lock is poisoned.
    pub fn get(&self, id: &RecordId) -> Result<Option<UserRecord>, RemoteError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn fetch_all(&self) -> Result<BTreeMap<RecordId, UserRecord>, RemoteError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn patch(&self, id: &RecordId, patch: &RecordPatch) -> Result<(), RemoteError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let record = guard.get_mut(id).ok_or(RemoteError::NotFound)?;
        patch.apply_to(record);
        Ok(())
    }

    async fn create(&self, record: &UserRecord) -> Result<RecordId, RemoteError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = RecordId::new(format!("-rec{n:08}"));
        let mut guard = self
            .records
            .lock()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        guard.insert(id.clone(), record.clone());
        Ok(id)
    }
}

/// Local persistence behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        Self { kv }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduplay_core::time::fixed_now;

    #[tokio::test]
    async fn kv_set_get_remove() {
        let kv = InMemoryKeyValueStore::new();
        assert_eq!(kv.get("k").await.unwrap(), None);
        kv.set("k", "v1").await.unwrap();
        kv.set("k", "v2").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("v2"));
        kv.remove("k").await.unwrap();
        kv.remove("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn directory_ids_follow_creation_order() {
        let dir = InMemoryUserDirectory::new();
        let first = dir
            .create(&UserRecord {
                email: "a@x".into(),
                ..UserRecord::default()
            })
            .await
            .unwrap();
        let second = dir
            .create(&UserRecord {
                email: "b@x".into(),
                ..UserRecord::default()
            })
            .await
            .unwrap();
        assert!(first < second);

        let all = dir.fetch_all().await.unwrap();
        let emails: Vec<_> = all.values().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, ["a@x", "b@x"]);
    }

    #[tokio::test]
    async fn directory_patch_is_a_merge() {
        let dir = InMemoryUserDirectory::new();
        let id = dir
            .create(&UserRecord {
                email: "a@x".into(),
                full_name: Some("Ada".into()),
                ..UserRecord::default()
            })
            .await
            .unwrap();

        let patch = RecordPatch {
            total_topics: Some(3),
            last_updated: Some(fixed_now()),
            ..RecordPatch::default()
        };
        dir.patch(&id, &patch).await.unwrap();

        let stored = dir.get(&id).unwrap().unwrap();
        assert_eq!(stored.total_topics, 3);
        assert_eq!(stored.full_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn directory_patch_of_missing_record_fails() {
        let dir = InMemoryUserDirectory::new();
        let err = dir
            .patch(&RecordId::new("nope"), &RecordPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::NotFound);
    }
}
