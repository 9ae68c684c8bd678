use std::sync::Arc;

use eduplay_core::model::{RecordId, UserRecord};
use serde::{Deserialize, Serialize};

use crate::repository::{KeyValueStore, StorageError};

pub const CURRENT_USER_KEY: &str = "currentUser";

/// The signed-in user as last seen, plus the remote record id once discovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub user: UserRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
}

/// Persists the signed-in user under `currentUser`.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or holds a corrupt value.
    pub async fn load(&self) -> Result<Option<StoredSession>, StorageError> {
        let Some(raw) = self.kv.get(CURRENT_USER_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be written.
    pub async fn save(&self, session: &StoredSession) -> Result<(), StorageError> {
        let value =
            serde_json::to_string(session).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(CURRENT_USER_KEY, &value).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the key cannot be removed.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.kv.remove(CURRENT_USER_KEY).await
    }
}
