use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use eduplay_core::model::UserKey;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per user key. Mutations for a user run one at a time;
/// different users never wait on each other.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<UserKey, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user`. Released when the guard drops.
    ///
    /// Entries nobody holds or waits on are dropped here, so the map only
    /// tracks users with work in flight.
    pub async fn acquire(&self, user: &UserKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry(user.clone()).or_default())
        };
        lock.lock_owned().await
    }
}
