mod curriculum;
mod ids;
mod leaderboard;
mod progress;
mod topic;
mod user;

pub use curriculum::{Curriculum, CurriculumError, TopicSequence};
pub use ids::{RecordId, UserKey};
pub use leaderboard::{LeaderboardEntry, rank_users};
pub use progress::{AggregateProgress, CompletedTopics, PathProgress, percentage};
pub use topic::{PathName, Topic, TopicError};
pub use user::{Avatar, NewAccount, RecordPatch, SignUpDraft, SignUpError, UserRecord};
