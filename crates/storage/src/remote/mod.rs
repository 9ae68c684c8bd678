//! REST client for the remote user collection (`/users.json`, `/users/{id}.json`).
//!
//! No auth token is attached: the store is addressed by base URL alone.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use eduplay_core::model::{RecordId, RecordPatch, UserRecord};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::repository::{RemoteError, UserDirectory};

#[derive(Clone)]
pub struct HttpUserDirectory {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    name: String,
}

impl HttpUserDirectory {
    /// Build a client whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn users_url(&self) -> String {
        format!("{}/users.json", self.base_url)
    }

    fn user_url(&self, id: &RecordId) -> String {
        format!("{}/users/{}.json", self.base_url, id.as_str())
    }
}

fn map_reqwest(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else if err.is_decode() {
        RemoteError::Decode(err.to_string())
    } else {
        RemoteError::Transport(err.to_string())
    }
}

fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RemoteError::Status(status.as_u16()))
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn fetch_all(&self) -> Result<BTreeMap<RecordId, UserRecord>, RemoteError> {
        let response = self
            .client
            .get(self.users_url())
            .send()
            .await
            .map_err(map_reqwest)?;
        let body: Option<BTreeMap<String, Value>> =
            ensure_success(response)?.json().await.map_err(map_reqwest)?;

        // An empty collection comes back as `null`.
        let Some(raw) = body else {
            return Ok(BTreeMap::new());
        };

        let mut records = BTreeMap::new();
        for (id, value) in raw {
            // Entries without an email belong to no one and can be skipped. A
            // user's own record failing to decode must not read as "no record".
            let has_email = value.get("email").and_then(Value::as_str).is_some();
            match serde_json::from_value::<UserRecord>(value) {
                Ok(record) => {
                    records.insert(RecordId::new(id), record);
                }
                Err(err) if has_email => {
                    warn!(record_id = %id, error = %err, "undecodable user record");
                    return Err(RemoteError::Decode(format!("record {id}: {err}")));
                }
                Err(err) => warn!(record_id = %id, error = %err, "skipping record without email"),
            }
        }
        debug!(count = records.len(), "fetched user records");
        Ok(records)
    }

    async fn patch(&self, id: &RecordId, patch: &RecordPatch) -> Result<(), RemoteError> {
        let response = self
            .client
            .patch(self.user_url(id))
            .json(patch)
            .send()
            .await
            .map_err(map_reqwest)?;
        ensure_success(response)?;
        Ok(())
    }

    async fn create(&self, record: &UserRecord) -> Result<RecordId, RemoteError> {
        let response = self
            .client
            .post(self.users_url())
            .json(record)
            .send()
            .await
            .map_err(map_reqwest)?;
        let created: CreatedResponse = ensure_success(response)?
            .json()
            .await
            .map_err(map_reqwest)?;
        Ok(RecordId::new(created.name))
    }
}
