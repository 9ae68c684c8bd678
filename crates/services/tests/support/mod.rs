#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eduplay_core::model::{
    Curriculum, PathName, RecordId, RecordPatch, Topic, TopicSequence, UserRecord,
};
use eduplay_core::time::fixed_clock;
use services::progress::RemoteProgressClient;
use services::{ProgressEngine, ProgressEvent, ProgressEvents, SessionContext};
use storage::repository::{InMemoryKeyValueStore, InMemoryUserDirectory, RemoteError};
use storage::{KeyValueStore, LocalProgressStore, SessionStore, StorageError, UserDirectory};

pub const TIMEOUT: Duration = Duration::from_millis(200);

/// In-memory directory with switches for the failure modes the engine must survive.
#[derive(Default)]
pub struct FlakyDirectory {
    pub inner: InMemoryUserDirectory,
    pub fail_fetch: AtomicBool,
    pub corrupt_fetch: AtomicBool,
    pub fail_writes: AtomicBool,
    pub stall: AtomicBool,
    pub patches: AtomicUsize,
}

impl FlakyDirectory {
    async fn gate(&self) {
        if self.stall.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        // Let a concurrent caller run between the read and the write.
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
    }

    pub fn record(&self, id: &RecordId) -> UserRecord {
        self.inner.get(id).unwrap().expect("record exists")
    }
}

#[async_trait]
impl UserDirectory for FlakyDirectory {
    async fn fetch_all(&self) -> Result<BTreeMap<RecordId, UserRecord>, RemoteError> {
        self.gate().await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        if self.corrupt_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Decode("record -ada: invalid createdAt".into()));
        }
        self.inner.fetch_all().await
    }

    async fn patch(&self, id: &RecordId, patch: &RecordPatch) -> Result<(), RemoteError> {
        self.gate().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        self.patches.fetch_add(1, Ordering::SeqCst);
        self.inner.patch(id, patch).await
    }

    async fn create(&self, record: &UserRecord) -> Result<RecordId, RemoteError> {
        self.gate().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        self.inner.create(record).await
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingEvents {
    pub fn take(&self) -> Vec<ProgressEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl ProgressEvents for RecordingEvents {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Key-value store whose writes can be switched off.
#[derive(Default)]
pub struct FailingWritesStore {
    pub inner: InMemoryKeyValueStore,
    pub fail_set: AtomicBool,
}

#[async_trait]
impl KeyValueStore for FailingWritesStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("disk full".into()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

pub fn topic(name: &str) -> Topic {
    Topic::new(name).unwrap()
}

/// css = [A, B, C], javascript = [X, Y]
pub fn small_curriculum() -> Arc<Curriculum> {
    let css = TopicSequence::new(PathName::css(), ["A", "B", "C"].map(topic).to_vec()).unwrap();
    let js = TopicSequence::new(PathName::javascript(), ["X", "Y"].map(topic).to_vec()).unwrap();
    Arc::new(Curriculum::new([css, js]).unwrap())
}

pub struct Harness {
    pub engine: ProgressEngine,
    pub directory: Arc<FlakyDirectory>,
    pub local: LocalProgressStore,
    pub sessions: SessionStore,
    pub events: Arc<RecordingEvents>,
}

pub fn harness() -> Harness {
    harness_with_store(Arc::new(InMemoryKeyValueStore::new()))
}

pub fn harness_with_store(kv: Arc<dyn KeyValueStore>) -> Harness {
    let curriculum = small_curriculum();
    let directory = Arc::new(FlakyDirectory::default());
    let local = LocalProgressStore::new(Arc::clone(&kv), Arc::clone(&curriculum));
    let sessions = SessionStore::new(kv);
    let events = Arc::new(RecordingEvents::default());
    let engine = ProgressEngine::new(
        fixed_clock(),
        curriculum,
        local.clone(),
        RemoteProgressClient::new(directory.clone(), TIMEOUT),
        sessions.clone(),
        events.clone(),
    );
    Harness {
        engine,
        directory,
        local,
        sessions,
        events,
    }
}

pub fn ada() -> UserRecord {
    UserRecord {
        email: "ada@example.com".into(),
        password: Some("secret".into()),
        full_name: Some("Ada Lovelace".into()),
        ..UserRecord::default()
    }
}

/// Seed Ada's record (without progress fields) and return a context that has
/// not yet discovered its record id.
pub fn seeded(h: &Harness) -> (SessionContext, RecordId) {
    let id = RecordId::new("-ada");
    h.directory.inner.insert(id.clone(), ada()).unwrap();
    (SessionContext::new(ada(), None), id)
}
