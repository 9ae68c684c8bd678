//! Device-local progress cache, one JSON cell per (user, path).

use std::collections::BTreeMap;
use std::sync::Arc;

use eduplay_core::model::{
    CompletedTopics, Curriculum, CurriculumError, PathName, PathProgress, UserKey,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::repository::{KeyValueStore, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressStoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
}

/// Stored value of one cell. Written as a single value so readers never see
/// a progress figure from one write next to topics from another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCell {
    pub progress: f64,
    pub completed_topics: CompletedTopics,
    /// Set while the cell holds a change the remote record has not confirmed.
    #[serde(default)]
    pub pending_sync: bool,
}

impl ProgressCell {
    #[must_use]
    pub fn to_path_progress(&self) -> PathProgress {
        PathProgress {
            progress: self.progress,
            completed: self.completed_topics.clone(),
        }
    }
}

#[must_use]
pub fn progress_key(user: &UserKey, path: &PathName) -> String {
    format!("{}_{}Progress", user.as_str(), path.as_str())
}

#[derive(Clone)]
pub struct LocalProgressStore {
    kv: Arc<dyn KeyValueStore>,
    curriculum: Arc<Curriculum>,
}

impl LocalProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, curriculum: Arc<Curriculum>) -> Self {
        Self { kv, curriculum }
    }

    /// Read a cell. Storage failures and corrupt values read as absent.
    pub async fn read_progress(&self, user: &UserKey, path: &PathName) -> Option<ProgressCell> {
        let key = progress_key(user, path);
        let raw = match self.kv.get(&key).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(%key, error = %err, "local progress read failed; treating as absent");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(cell) => Some(cell),
            Err(err) => {
                warn!(%key, error = %err, "corrupt local progress cell; treating as absent");
                None
            }
        }
    }

    /// Cells for every curriculum path, absent ones included as `None`.
    pub async fn read_all(&self, user: &UserKey) -> BTreeMap<PathName, Option<ProgressCell>> {
        let mut cells = BTreeMap::new();
        for path in self.curriculum.paths() {
            cells.insert(path.clone(), self.read_progress(user, path).await);
        }
        cells
    }

    /// Recompute progress from the path length and overwrite the cell.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError::Curriculum` for an undefined path and
    /// `ProgressStoreError::Storage` if the write fails.
    pub async fn write_progress(
        &self,
        user: &UserKey,
        path: &PathName,
        completed: CompletedTopics,
        pending_sync: bool,
    ) -> Result<ProgressCell, ProgressStoreError> {
        let sequence = self.curriculum.require(path)?;
        let computed = PathProgress::compute(completed, sequence);
        let cell = ProgressCell {
            progress: computed.progress,
            completed_topics: computed.completed,
            pending_sync,
        };
        let value = serde_json::to_string(&cell)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(&progress_key(user, path), &value).await?;
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKeyValueStore;
    use eduplay_core::model::{Topic, TopicSequence};

    fn store() -> (LocalProgressStore, Arc<InMemoryKeyValueStore>) {
        let abc = TopicSequence::new(
            PathName::css(),
            ["A", "B", "C"].iter().map(|t| Topic::new(*t).unwrap()).collect(),
        )
        .unwrap();
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let curriculum = Arc::new(Curriculum::new([abc]).unwrap());
        (LocalProgressStore::new(kv.clone(), curriculum), kv)
    }

    fn user() -> UserKey {
        UserKey::new("ada@example.com")
    }

    #[test]
    fn key_matches_legacy_layout() {
        assert_eq!(progress_key(&user(), &PathName::css()), "ada@example.com_cssProgress");
    }

    #[tokio::test]
    async fn absent_cell_reads_as_none() {
        let (store, _) = store();
        assert!(store.read_progress(&user(), &PathName::css()).await.is_none());
    }

    #[tokio::test]
    async fn write_then_read_returns_same_set() {
        let (store, _) = store();
        let completed: CompletedTopics =
            [Topic::new("A").unwrap(), Topic::new("B").unwrap()].into_iter().collect();

        store
            .write_progress(&user(), &PathName::css(), completed.clone(), false)
            .await
            .unwrap();
        let cell = store.read_progress(&user(), &PathName::css()).await.unwrap();

        assert_eq!(cell.completed_topics, completed);
        assert!((cell.progress - 200.0 / 3.0).abs() < 1e-9);
        assert!(!cell.pending_sync);
    }

    #[tokio::test]
    async fn corrupt_cell_reads_as_none() {
        let (store, kv) = store();
        kv.set("ada@example.com_cssProgress", "{not json").await.unwrap();
        assert!(store.read_progress(&user(), &PathName::css()).await.is_none());
    }

    #[tokio::test]
    async fn legacy_cell_without_pending_flag_decodes() {
        let (store, kv) = store();
        kv.set(
            "ada@example.com_cssProgress",
            r#"{"progress":33.3,"completedTopics":["A","A"]}"#,
        )
        .await
        .unwrap();
        let cell = store.read_progress(&user(), &PathName::css()).await.unwrap();
        assert_eq!(cell.completed_topics.len(), 1);
        assert!(!cell.pending_sync);
    }

    #[tokio::test]
    async fn unknown_path_is_refused() {
        let (store, _) = store();
        let err = store
            .write_progress(
                &user(),
                &PathName::javascript(),
                CompletedTopics::new(),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressStoreError::Curriculum(_)));
    }
}
