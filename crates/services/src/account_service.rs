use eduplay_core::model::SignUpDraft;
use storage::SessionStore;
use tracing::{info, warn};

use crate::context::SessionContext;
use crate::error::AccountError;
use crate::progress::RemoteProgressClient;
use crate::Clock;

/// Sign-up, sign-in and the persisted "current user".
///
/// Credentials are compared in plaintext against the remote records. That is
/// how existing accounts are stored and it is not a security boundary.
#[derive(Clone)]
pub struct AccountService {
    clock: Clock,
    remote: RemoteProgressClient,
    sessions: SessionStore,
}

impl AccountService {
    #[must_use]
    pub fn new(clock: Clock, remote: RemoteProgressClient, sessions: SessionStore) -> Self {
        Self {
            clock,
            remote,
            sessions,
        }
    }

    /// Validate the form, reject a taken email, and create the remote record.
    ///
    /// The new account is not signed in.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` for an invalid form,
    /// `AccountError::EmailTaken` if a record already uses the email, and
    /// `AccountError::Network` / `AccountError::RemoteWrite` for remote failures.
    pub async fn sign_up(&self, draft: SignUpDraft) -> Result<SessionContext, AccountError> {
        let account = draft.validate()?;
        let existing = self
            .remote
            .find_record_by_email(account.email())
            .await
            .map_err(AccountError::Network)?;
        if existing.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let record = account.into_record(self.clock.now());
        let record_id = self
            .remote
            .create_record(&record)
            .await
            .map_err(AccountError::RemoteWrite)?;
        info!(%record_id, email = %record.email, "account created");
        Ok(SessionContext::new(record, Some(record_id)))
    }

    /// Find the record matching both email and password and remember it as
    /// the current user.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NoAccounts` when the collection is empty,
    /// `AccountError::InvalidCredentials` when nothing matches,
    /// `AccountError::Network` if the records cannot be fetched and
    /// `AccountError::Storage` if the session cannot be saved.
    pub async fn log_in(&self, email: &str, password: &str) -> Result<SessionContext, AccountError> {
        let users = self
            .remote
            .fetch_all_users()
            .await
            .map_err(AccountError::Network)?;
        if users.is_empty() {
            return Err(AccountError::NoAccounts);
        }

        let email = email.trim();
        let (record_id, user) = users
            .into_iter()
            .find(|(_, record)| record.matches_credentials(email, password))
            .ok_or(AccountError::InvalidCredentials)?;

        let ctx = SessionContext::new(user, Some(record_id));
        self.sessions.save(&ctx.to_stored()).await?;
        info!(email = %ctx.user.email, "signed in");
        Ok(ctx)
    }

    /// # Errors
    ///
    /// Returns `AccountError::Storage` if the stored session cannot be removed.
    pub async fn log_out(&self) -> Result<(), AccountError> {
        self.sessions.clear().await?;
        info!("signed out");
        Ok(())
    }

    /// The persisted current user, if any. A corrupt stored value reads as
    /// signed out.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Storage` if the local store cannot be read.
    pub async fn restore_session(&self) -> Result<Option<SessionContext>, AccountError> {
        match self.sessions.load().await {
            Ok(stored) => Ok(stored.map(SessionContext::from)),
            Err(storage::StorageError::Serialization(detail)) => {
                warn!(%detail, "discarding unreadable stored session");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use eduplay_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryKeyValueStore, InMemoryUserDirectory};
    use storage::{KeyValueStore, UserDirectory};

    fn draft(email: &str) -> SignUpDraft {
        SignUpDraft {
            email: email.to_string(),
            password: "secret".to_string(),
            confirm_password: "secret".to_string(),
            full_name: "Ada Lovelace".to_string(),
            avatar_id: Some(1),
        }
    }

    fn service() -> (AccountService, Arc<InMemoryUserDirectory>, Arc<InMemoryKeyValueStore>) {
        let directory = Arc::new(InMemoryUserDirectory::new());
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let remote = RemoteProgressClient::new(directory.clone(), Duration::from_secs(5));
        let service = AccountService::new(fixed_clock(), remote, SessionStore::new(kv.clone()));
        (service, directory, kv)
    }

    #[tokio::test]
    async fn sign_up_creates_zeroed_record() {
        let (service, directory, _) = service();
        let ctx = service.sign_up(draft("ada@example.com")).await.unwrap();

        let id = ctx.record_id.clone().unwrap();
        let stored = directory.get(&id).unwrap().unwrap();
        assert_eq!(stored.email, "ada@example.com");
        assert_eq!(stored.created_at, Some(fixed_now()));
        assert_eq!(stored.total_topics, 0);
        assert_eq!(stored.app_usage_time, 0);
        assert!(!stored.has_progress());
    }

    #[tokio::test]
    async fn sign_up_rejects_taken_email() {
        let (service, _, _) = service();
        service.sign_up(draft("ada@example.com")).await.unwrap();
        let err = service.sign_up(draft("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_remote() {
        let (service, directory, _) = service();
        let mut bad = draft("ada@example.com");
        bad.confirm_password = "other".to_string();
        let err = service.sign_up(bad).await.unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
        assert!(directory.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn log_in_requires_accounts_and_matching_password() {
        let (service, _, _) = service();
        assert!(matches!(
            service.log_in("ada@example.com", "secret").await,
            Err(AccountError::NoAccounts)
        ));

        service.sign_up(draft("ada@example.com")).await.unwrap();
        assert!(matches!(
            service.log_in("ada@example.com", "wrong").await,
            Err(AccountError::InvalidCredentials)
        ));

        let ctx = service.log_in("ada@example.com", "secret").await.unwrap();
        assert!(ctx.record_id.is_some());
        let restored = service.restore_session().await.unwrap().unwrap();
        assert_eq!(restored, ctx);
    }

    #[tokio::test]
    async fn log_out_clears_session() {
        let (service, _, _) = service();
        service.sign_up(draft("ada@example.com")).await.unwrap();
        service.log_in("ada@example.com", "secret").await.unwrap();
        service.log_out().await.unwrap();
        assert!(service.restore_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_session_reads_as_signed_out() {
        let (service, _, kv) = service();
        kv.set(storage::session_store::CURRENT_USER_KEY, "{not json")
            .await
            .unwrap();
        assert!(service.restore_session().await.unwrap().is_none());
    }
}
