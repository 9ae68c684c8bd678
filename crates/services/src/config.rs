use std::env;
use std::time::Duration;

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the remote user collection lives and how long a call may take.
///
/// There is no credential: the store is reachable by URL alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    /// Reads `EDUPLAY_REMOTE_URL` and `EDUPLAY_REMOTE_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("EDUPLAY_REMOTE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self::with_env_timeout(base_url.trim()))
    }

    /// `base_url` with the timeout from `EDUPLAY_REMOTE_TIMEOUT_SECS`, for
    /// callers that take the URL from somewhere else.
    #[must_use]
    pub fn with_env_timeout(base_url: impl Into<String>) -> Self {
        let raw = env::var("EDUPLAY_REMOTE_TIMEOUT_SECS").ok();
        Self {
            base_url: base_url.into(),
            timeout: parse_timeout(raw.as_deref()),
        }
    }
}

/// Whole positive seconds; anything else falls back to the default.
fn parse_timeout(raw: Option<&str>) -> Duration {
    raw.and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map_or(DEFAULT_REMOTE_TIMEOUT, Duration::from_secs)
}
