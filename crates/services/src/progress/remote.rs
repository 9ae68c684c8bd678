use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use eduplay_core::model::{RecordId, RecordPatch, UserRecord};
use storage::repository::{RemoteError, UserDirectory};
use tracing::debug;

/// Client for the authoritative per-user record.
///
/// Every call is bounded by `timeout`; expiry surfaces as `RemoteError::Timeout`
/// exactly like a transport failure.
#[derive(Clone)]
pub struct RemoteProgressClient {
    directory: Arc<dyn UserDirectory>,
    timeout: Duration,
}

impl RemoteProgressClient {
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(RemoteError::Timeout))
    }

    /// # Errors
    ///
    /// Returns `RemoteError` on transport failure or timeout. Callers must not
    /// read a failure as "no users".
    pub async fn fetch_all_users(&self) -> Result<BTreeMap<RecordId, UserRecord>, RemoteError> {
        self.bounded(self.directory.fetch_all()).await
    }

    /// Linear scan for the record owning `email`. `Ok(None)` means no such record.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the collection cannot be fetched.
    pub async fn find_record_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(RecordId, UserRecord)>, RemoteError> {
        let found = self
            .fetch_all_users()
            .await?
            .into_iter()
            .find(|(_, record)| record.email == email);
        debug!(%email, found = found.is_some(), "scanned user records");
        Ok(found)
    }

    /// # Errors
    ///
    /// Returns `RemoteError` unless the store confirms the merge.
    pub async fn patch_record(&self, id: &RecordId, patch: &RecordPatch) -> Result<(), RemoteError> {
        self.bounded(self.directory.patch(id, patch)).await
    }

    /// # Errors
    ///
    /// Returns `RemoteError` unless the store confirms the create.
    pub async fn create_record(&self, record: &UserRecord) -> Result<RecordId, RemoteError> {
        self.bounded(self.directory.create(record)).await
    }
}
