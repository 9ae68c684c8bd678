use crate::model::ids::RecordId;
use crate::model::user::UserRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub record_id: RecordId,
    pub email: String,
    pub name: String,
    pub total_topics: u32,
    pub total_progress: f64,
}

/// Rank users by completed topic count, highest first.
///
/// The sort is stable, so ties keep the order records arrive in (record-id
/// order from the store, which is creation order for generated ids).
#[must_use]
pub fn rank_users<I>(records: I) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = (RecordId, UserRecord)>,
{
    let mut rows: Vec<(RecordId, UserRecord)> = records.into_iter().collect();
    rows.sort_by(|(_, a), (_, b)| b.total_topics.cmp(&a.total_topics));
    rows.into_iter()
        .enumerate()
        .map(|(position, (record_id, record))| LeaderboardEntry {
            rank: position + 1,
            record_id,
            name: record.display_name().to_string(),
            email: record.email,
            total_topics: record.total_topics,
            total_progress: record.total_progress,
        })
        .collect()
}
