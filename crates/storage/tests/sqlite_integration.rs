use std::sync::Arc;

use eduplay_core::model::{CompletedTopics, Curriculum, PathName, Topic, UserKey};
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;
use storage::{LocalProgressStore, SessionStore, StoredSession};

#[tokio::test]
async fn sqlite_kv_overwrites_and_removes() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // Migrations are versioned; a second run is a no-op.
    repo.migrate().await.expect("migrate twice");

    assert_eq!(repo.get("theme").await.unwrap(), None);
    repo.set("theme", "light").await.unwrap();
    repo.set("theme", "dark").await.unwrap();
    assert_eq!(repo.get("theme").await.unwrap().as_deref(), Some("dark"));

    repo.remove("theme").await.unwrap();
    assert_eq!(repo.get("theme").await.unwrap(), None);
}

#[tokio::test]
async fn progress_cells_survive_on_sqlite() {
    let storage = Storage::sqlite("sqlite:file:memdb_progress?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    let curriculum = Arc::new(Curriculum::builtin());
    let store = LocalProgressStore::new(Arc::clone(&storage.kv), Arc::clone(&curriculum));
    let user = UserKey::new("grace@example.com");

    let completed: CompletedTopics = ["CSS Introduction", "Inline CSS"]
        .iter()
        .map(|t| Topic::new(*t).unwrap())
        .collect();
    store
        .write_progress(&user, &PathName::css(), completed.clone(), true)
        .await
        .expect("write");

    let cells = store.read_all(&user).await;
    let css = cells[&PathName::css()].clone().expect("css cell");
    assert_eq!(css.completed_topics, completed);
    assert!(css.pending_sync);
    assert!((css.progress - 2.0 / 52.0 * 100.0).abs() < 1e-9);
    assert!(cells[&PathName::javascript()].is_none());
}

#[tokio::test]
async fn session_round_trips_on_sqlite() {
    let storage = Storage::sqlite("sqlite:file:memdb_session?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    let sessions = SessionStore::new(Arc::clone(&storage.kv));

    let session = StoredSession {
        user: eduplay_core::model::UserRecord {
            email: "grace@example.com".into(),
            full_name: Some("Grace".into()),
            ..Default::default()
        },
        record_id: None,
    };
    sessions.save(&session).await.unwrap();
    assert_eq!(sessions.load().await.unwrap(), Some(session));
}
