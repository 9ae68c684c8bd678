use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic name cannot be empty")]
    EmptyTopic,

    #[error("path name cannot be empty")]
    EmptyPath,

    #[error("path name must be lowercase ascii letters, digits or '-': {0}")]
    InvalidPath(String),
}

/// A single ordered unit of content within a learning path.
///
/// Identity is the trimmed text; position comes from the owning sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(pub(crate) String);

impl Topic {
    /// Create a validated topic name.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyTopic` if the name is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TopicError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TopicError::EmptyTopic);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Topic> for String {
    fn from(value: Topic) -> Self {
        value.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a curriculum path such as `css` or `javascript`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathName(String);

impl PathName {
    /// Create a validated path name.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyPath` for blank input and
    /// `TopicError::InvalidPath` for characters outside `[a-z0-9-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, TopicError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TopicError::EmptyPath);
        }
        let valid = trimmed
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(TopicError::InvalidPath(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn css() -> Self {
        Self("css".to_string())
    }

    #[must_use]
    pub fn javascript() -> Self {
        Self("javascript".to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PathName {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PathName {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PathName> for String {
    fn from(value: PathName) -> Self {
        value.0
    }
}

impl fmt::Display for PathName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_is_trimmed() {
        let topic = Topic::new("  CSS Colors ").unwrap();
        assert_eq!(topic.as_str(), "CSS Colors");
    }

    #[test]
    fn blank_topic_is_rejected() {
        assert_eq!(Topic::new("   "), Err(TopicError::EmptyTopic));
    }

    #[test]
    fn path_rejects_uppercase() {
        assert!(matches!(
            PathName::new("CSS"),
            Err(TopicError::InvalidPath(_))
        ));
        assert_eq!("css".parse::<PathName>().unwrap(), PathName::css());
    }

    #[test]
    fn blank_topic_fails_to_deserialize() {
        let parsed: Result<Topic, _> = serde_json::from_str("\"  \"");
        assert!(parsed.is_err());
    }
}
