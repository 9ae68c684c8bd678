use eduplay_core::model::{RecordId, UserKey, UserRecord};
use storage::StoredSession;

/// The signed-in user, passed explicitly into every progress call.
///
/// `record_id` caches the remote key once a scan has found it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub user: UserRecord,
    pub record_id: Option<RecordId>,
}

impl SessionContext {
    #[must_use]
    pub fn new(user: UserRecord, record_id: Option<RecordId>) -> Self {
        Self { user, record_id }
    }

    #[must_use]
    pub fn user_key(&self) -> UserKey {
        self.user.user_key()
    }

    #[must_use]
    pub fn to_stored(&self) -> StoredSession {
        StoredSession {
            user: self.user.clone(),
            record_id: self.record_id.clone(),
        }
    }
}

impl From<StoredSession> for SessionContext {
    fn from(stored: StoredSession) -> Self {
        Self::new(stored.user, stored.record_id)
    }
}
