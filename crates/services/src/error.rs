//! Shared error types for the services crate.

use thiserror::Error;

use eduplay_core::ladder::LadderError;
use eduplay_core::model::{CurriculumError, SignUpError};
use storage::repository::{RemoteError, StorageError};
use storage::sqlite::SqliteInitError;
use storage::ProgressStoreError;

/// Errors emitted by `ProgressEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress could not be saved on this device: {0}")]
    LocalStore(#[from] StorageError),

    #[error("progress service temporarily unavailable: {0}")]
    Network(RemoteError),

    #[error("progress may not be saved: {0}")]
    RemoteWrite(RemoteError),

    #[error(transparent)]
    Validation(#[from] LadderError),

    #[error("configuration error: {0}")]
    Config(#[from] CurriculumError),
}

impl ProgressError {
    /// Whether the UI should show this error. Locked presses are handled
    /// without bothering the user.
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

impl From<ProgressStoreError> for ProgressError {
    fn from(err: ProgressStoreError) -> Self {
        match err {
            ProgressStoreError::Storage(err) => Self::LocalStore(err),
            ProgressStoreError::Curriculum(err) => Self::Config(err),
            other => Self::LocalStore(StorageError::Connection(other.to_string())),
        }
    }
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] SignUpError),
    #[error("email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no users found")]
    NoAccounts,
    #[error("account service unavailable: {0}")]
    Network(RemoteError),
    #[error("failed to create account: {0}")]
    RemoteWrite(RemoteError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LeaderboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LeaderboardError {
    #[error("failed to load leaderboard data: {0}")]
    Network(#[from] RemoteError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
