use std::sync::Arc;

use eduplay_core::model::Curriculum;
use storage::repository::{Storage, UserDirectory};
use storage::{HttpUserDirectory, LocalProgressStore, SessionStore};

use crate::account_service::AccountService;
use crate::config::RemoteConfig;
use crate::error::AppServicesError;
use crate::leaderboard_service::LeaderboardService;
use crate::progress::{ProgressEngine, ProgressEvents, RemoteProgressClient};
use crate::Clock;

/// Assembles app-facing services over one local store and one remote directory.
#[derive(Clone)]
pub struct AppServices {
    curriculum: Arc<Curriculum>,
    accounts: Arc<AccountService>,
    progress: Arc<ProgressEngine>,
    leaderboard: Arc<LeaderboardService>,
}

impl AppServices {
    /// Wire services over explicit adapters. Used by tests and by
    /// [`AppServices::new_sqlite`].
    #[must_use]
    pub fn new(
        storage: &Storage,
        directory: Arc<dyn UserDirectory>,
        config: &RemoteConfig,
        clock: Clock,
        events: Arc<dyn ProgressEvents>,
    ) -> Self {
        let curriculum = Arc::new(Curriculum::builtin());
        let remote = RemoteProgressClient::new(directory, config.timeout);
        let sessions = SessionStore::new(Arc::clone(&storage.kv));
        let local = LocalProgressStore::new(Arc::clone(&storage.kv), Arc::clone(&curriculum));

        let accounts = Arc::new(AccountService::new(clock, remote.clone(), sessions.clone()));
        let leaderboard = Arc::new(LeaderboardService::new(remote.clone()));
        let progress = Arc::new(ProgressEngine::new(
            clock,
            Arc::clone(&curriculum),
            local,
            remote,
            sessions,
            events,
        ));

        Self {
            curriculum,
            accounts,
            progress,
            leaderboard,
        }
    }

    /// Build services backed by `SQLite` storage and the HTTP user directory.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the HTTP
    /// client cannot be built.
    pub async fn new_sqlite(
        db_url: &str,
        config: &RemoteConfig,
        clock: Clock,
        events: Arc<dyn ProgressEvents>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let directory: Arc<dyn UserDirectory> =
            Arc::new(HttpUserDirectory::new(&config.base_url, config.timeout)?);
        Ok(Self::new(&storage, directory, config, clock, events))
    }

    #[must_use]
    pub fn curriculum(&self) -> Arc<Curriculum> {
        Arc::clone(&self.curriculum)
    }

    #[must_use]
    pub fn accounts(&self) -> Arc<AccountService> {
        Arc::clone(&self.accounts)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressEngine> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }
}
