use eduplay_core::model::{LeaderboardEntry, rank_users};
use tracing::debug;

use crate::error::LeaderboardError;
use crate::progress::RemoteProgressClient;

/// Ranks every user by completed topics.
#[derive(Clone)]
pub struct LeaderboardService {
    remote: RemoteProgressClient,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(remote: RemoteProgressClient) -> Self {
        Self { remote }
    }

    /// # Errors
    ///
    /// Returns `LeaderboardError::Network` if the records cannot be fetched.
    /// A failed fetch is never reported as an empty board.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let users = self.remote.fetch_all_users().await?;
        let entries = rank_users(users);
        debug!(entries = entries.len(), "leaderboard ranked");
        Ok(entries)
    }
}
