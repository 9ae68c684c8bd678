use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::curriculum::Curriculum;
use crate::model::ids::UserKey;
use crate::model::progress::{AggregateProgress, CompletedTopics};
use crate::model::topic::PathName;
use crate::time::serialize_wire_timestamp;

/// Cartoon avatar picked at sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: u32,
    pub face: String,
    pub hair: String,
    pub mouth: String,
    pub color: String,
}

impl Avatar {
    fn preset(id: u32, face: &str, mouth: &str, color: &str) -> Self {
        Self {
            id,
            face: face.to_string(),
            hair: "hair-dryer".to_string(),
            mouth: mouth.to_string(),
            color: color.to_string(),
        }
    }

    /// The six selectable avatars.
    #[must_use]
    pub fn presets() -> Vec<Self> {
        vec![
            Self::preset(1, "face-woman", "emoticon-happy", "#FF6B6B"),
            Self::preset(2, "face-man", "emoticon-happy", "#4ECDC4"),
            Self::preset(3, "face-woman", "emoticon-cool", "#45B7D1"),
            Self::preset(4, "face-man", "emoticon-cool", "#FFD93D"),
            Self::preset(5, "face-woman", "emoticon-excited", "#95E1D3"),
            Self::preset(6, "face-man", "emoticon-excited", "#FF8B94"),
        ]
    }

    #[must_use]
    pub fn by_id(id: u32) -> Option<Self> {
        Self::presets().into_iter().find(|avatar| avatar.id == id)
    }
}

/// A user document as the remote store holds it.
///
/// Progress fields are optional on the wire: accounts created before any
/// progress load have no `completedTopics`. Unknown fields ride along in
/// `extra` so a round trip never drops data another client wrote.
///
/// `password` is stored and compared in plaintext. This mirrors the existing
/// backend and is a known weakness, not a security model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Avatar>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_wire_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub app_usage_time: u64,
    #[serde(default)]
    pub total_topics: u32,
    #[serde(default)]
    pub total_progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_topics: Option<BTreeMap<String, Vec<String>>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_wire_timestamp"
    )]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    #[must_use]
    pub fn user_key(&self) -> UserKey {
        UserKey::new(self.email.clone())
    }

    /// True once the record carries the per-path progress mapping.
    #[must_use]
    pub fn has_progress(&self) -> bool {
        self.completed_topics.is_some()
    }

    /// Completed set for one path, deduplicated. Missing paths read as empty.
    #[must_use]
    pub fn completed_for(&self, path: &PathName) -> CompletedTopics {
        self.completed_topics
            .as_ref()
            .and_then(|map| map.get(path.as_str()))
            .map(|topics| CompletedTopics::from_strings(topics.iter().cloned()))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn matches_credentials(&self, email: &str, password: &str) -> bool {
        self.email == email && self.password.as_deref() == Some(password)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Partial update merged into a remote record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_topics: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_topics: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_progress: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_wire_timestamp"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl RecordPatch {
    /// Full progress write: every path's set plus the derived aggregates.
    #[must_use]
    pub fn progress(
        completed: &BTreeMap<PathName, CompletedTopics>,
        aggregate: AggregateProgress,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            completed_topics: Some(
                completed
                    .iter()
                    .map(|(path, topics)| (path.as_str().to_string(), topics.to_strings()))
                    .collect(),
            ),
            total_topics: Some(aggregate.total_topics),
            total_progress: Some(aggregate.total_progress),
            last_updated: Some(at),
        }
    }

    /// Empty per-path mapping with zeroed aggregates, for records that have never held progress.
    #[must_use]
    pub fn initial(curriculum: &Curriculum, at: DateTime<Utc>) -> Self {
        let empty = curriculum
            .paths()
            .map(|path| (path.clone(), CompletedTopics::new()))
            .collect();
        Self::progress(
            &empty,
            AggregateProgress {
                total_topics: 0,
                total_progress: 0.0,
            },
            at,
        )
    }

    /// Merge into a record the way the remote store merges a PATCH body.
    pub fn apply_to(&self, record: &mut UserRecord) {
        if let Some(completed) = &self.completed_topics {
            record.completed_topics = Some(completed.clone());
        }
        if let Some(total) = self.total_topics {
            record.total_topics = total;
        }
        if let Some(progress) = self.total_progress {
            record.total_progress = progress;
        }
        if let Some(at) = self.last_updated {
            record.last_updated = Some(at);
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignUpError {
    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("enter full name")]
    EmptyFullName,

    #[error("select an avatar")]
    MissingAvatar,

    #[error("unknown avatar {0}")]
    UnknownAvatar(u32),
}

/// Raw sign-up form input.
#[derive(Debug, Clone, Default)]
pub struct SignUpDraft {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub avatar_id: Option<u32>,
}

/// Sign-up input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    email: String,
    password: String,
    full_name: String,
    avatar: Avatar,
}

impl SignUpDraft {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns the first `SignUpError` found, checking email, password,
    /// confirmation, name, then avatar.
    pub fn validate(self) -> Result<NewAccount, SignUpError> {
        let email = self.email.trim().to_string();
        if email.is_empty() {
            return Err(SignUpError::EmptyEmail);
        }
        if self.password.is_empty() {
            return Err(SignUpError::EmptyPassword);
        }
        if self.password != self.confirm_password {
            return Err(SignUpError::PasswordMismatch);
        }
        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(SignUpError::EmptyFullName);
        }
        let avatar_id = self.avatar_id.ok_or(SignUpError::MissingAvatar)?;
        let avatar = Avatar::by_id(avatar_id).ok_or(SignUpError::UnknownAvatar(avatar_id))?;

        Ok(NewAccount {
            email,
            password: self.password,
            full_name,
            avatar,
        })
    }
}

impl NewAccount {
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Initial document for the account: zeroed usage and aggregates, no progress mapping yet.
    #[must_use]
    pub fn into_record(self, created_at: DateTime<Utc>) -> UserRecord {
        UserRecord {
            email: self.email,
            password: Some(self.password),
            full_name: Some(self.full_name),
            avatar: Some(self.avatar),
            created_at: Some(created_at),
            app_usage_time: 0,
            total_topics: 0,
            total_progress: 0.0,
            completed_topics: None,
            last_updated: None,
            extra: Map::new(),
        }
    }
}
