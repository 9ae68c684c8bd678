use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::curriculum::{Curriculum, TopicSequence};
use crate::model::topic::{PathName, Topic};

/// Completed topics of one path. A set: duplicates collapse on insert and on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedTopics(BTreeSet<Topic>);

impl CompletedTopics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, topic: &Topic) -> bool {
        self.0.contains(topic)
    }

    /// Returns false when the topic was already present.
    pub fn insert(&mut self, topic: Topic) -> bool {
        self.0.insert(topic)
    }

    pub fn remove(&mut self, topic: &Topic) -> bool {
        self.0.remove(topic)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.0.iter()
    }

    /// Drop entries the sequence does not define. Returns how many were dropped.
    pub fn retain_known(&mut self, sequence: &TopicSequence) -> usize {
        let before = self.0.len();
        self.0.retain(|topic| sequence.contains(topic));
        before - self.0.len()
    }

    /// Plain strings in set order, the shape stored remotely.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|t| t.as_str().to_string()).collect()
    }

    /// Parse raw strings, skipping blank entries and collapsing duplicates.
    pub fn from_strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            values
                .into_iter()
                .filter_map(|value| Topic::new(value).ok())
                .collect(),
        )
    }
}

impl FromIterator<Topic> for CompletedTopics {
    fn from_iter<T: IntoIterator<Item = Topic>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// `count / total * 100`, unrounded. A zero total yields 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64) * 100.0
}

/// Completion of a single path plus its derived percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct PathProgress {
    pub progress: f64,
    pub completed: CompletedTopics,
}

impl PathProgress {
    #[must_use]
    pub fn compute(completed: CompletedTopics, sequence: &TopicSequence) -> Self {
        Self {
            progress: percentage(completed.len(), sequence.len()),
            completed,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            progress: 0.0,
            completed: CompletedTopics::new(),
        }
    }
}

/// Cross-path totals. Derived, never authoritative on their own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateProgress {
    pub total_topics: u32,
    pub total_progress: f64,
}

impl AggregateProgress {
    /// Sum completed counts over every curriculum path and divide by the full curriculum size.
    ///
    /// Paths missing from `completed` count as empty; keys the curriculum does not know are ignored.
    #[must_use]
    pub fn compute(curriculum: &Curriculum, completed: &BTreeMap<PathName, CompletedTopics>) -> Self {
        let count: usize = curriculum
            .paths()
            .filter_map(|path| completed.get(path))
            .map(CompletedTopics::len)
            .sum();
        Self {
            total_topics: u32::try_from(count).unwrap_or(u32::MAX),
            total_progress: percentage(count, curriculum.total_topics()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(path: &str, len: usize) -> TopicSequence {
        TopicSequence::new(
            PathName::new(path).unwrap(),
            (0..len).map(|i| Topic::new(format!("{path} {i}")).unwrap()).collect(),
        )
        .unwrap()
    }

    fn first_n(seq: &TopicSequence, n: usize) -> CompletedTopics {
        seq.topics().iter().take(n).cloned().collect()
    }

    #[test]
    fn duplicates_collapse_on_decode() {
        let parsed: CompletedTopics = serde_json::from_str(r#"["A","B","A"]"#).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn from_strings_skips_blank_entries() {
        let parsed = CompletedTopics::from_strings(["A", " ", "A", "B"]);
        assert_eq!(parsed.to_strings(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn path_progress_is_unrounded() {
        let seq = sequence("css", 3);
        let progress = PathProgress::compute(first_n(&seq, 1), &seq);
        assert!((progress.progress - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_over_two_paths() {
        let css = sequence("css", 50);
        let js = sequence("javascript", 20);
        let mut completed = BTreeMap::new();
        completed.insert(css.path().clone(), first_n(&css, 5));
        completed.insert(js.path().clone(), first_n(&js, 3));
        let curriculum = Curriculum::new([css, js]).unwrap();

        let aggregate = AggregateProgress::compute(&curriculum, &completed);
        assert_eq!(aggregate.total_topics, 8);
        assert!((aggregate.total_progress - 11.428_571).abs() < 0.01);
    }

    #[test]
    fn retain_known_drops_foreign_topics() {
        let seq = sequence("css", 2);
        let mut completed = first_n(&seq, 2);
        completed.insert(Topic::new("Retired Topic").unwrap());
        assert_eq!(completed.retain_known(&seq), 1);
        assert_eq!(completed.len(), 2);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        assert!(percentage(0, 0).abs() < f64::EPSILON);
    }
}
