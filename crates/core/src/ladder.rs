//! Unlock rules for a linear topic ladder.
//!
//! Topic 0 is always open. Topic `i` opens only while topic `i - 1` is both
//! completed and itself open, i.e. the whole prefix before `i` is completed.
//! Every check re-reads the set, so un-completing a topic re-locks everything
//! behind it even if later topics stay marked complete.

use thiserror::Error;

use crate::model::{CompletedTopics, Topic, TopicSequence};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LadderError {
    #[error("topic {0} is not part of this path")]
    UnknownTopic(Topic),

    #[error("topic {topic} at position {index} is locked")]
    Locked { topic: Topic, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    Completed,
    Available,
    Locked,
}

/// One rung of the ladder as the UI renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderStep {
    pub index: usize,
    pub topic: Topic,
    pub completed: bool,
    pub unlocked: bool,
}

impl LadderStep {
    /// A locked step reads as locked even when its topic is still in the completed set.
    #[must_use]
    pub fn status(&self) -> TopicStatus {
        if !self.unlocked {
            TopicStatus::Locked
        } else if self.completed {
            TopicStatus::Completed
        } else {
            TopicStatus::Available
        }
    }
}

/// Whether the topic at `index` may be pressed. Out-of-range indexes are locked.
#[must_use]
pub fn is_unlocked(sequence: &TopicSequence, completed: &CompletedTopics, index: usize) -> bool {
    index < sequence.len()
        && sequence.topics()[..index]
            .iter()
            .all(|topic| completed.contains(topic))
}

#[must_use]
pub fn ladder(sequence: &TopicSequence, completed: &CompletedTopics) -> Vec<LadderStep> {
    let mut unlocked = true;
    sequence
        .topics()
        .iter()
        .enumerate()
        .map(|(index, topic)| {
            let is_completed = completed.contains(topic);
            let step = LadderStep {
                index,
                topic: topic.clone(),
                completed: is_completed,
                unlocked,
            };
            unlocked = unlocked && is_completed;
            step
        })
        .collect()
}

/// Resolve a pressed topic to its index, refusing unknown or locked topics.
///
/// # Errors
///
/// Returns `LadderError::UnknownTopic` or `LadderError::Locked`.
pub fn check_press(
    sequence: &TopicSequence,
    completed: &CompletedTopics,
    topic: &Topic,
) -> Result<usize, LadderError> {
    let index = sequence
        .position(topic)
        .ok_or_else(|| LadderError::UnknownTopic(topic.clone()))?;
    if !is_unlocked(sequence, completed, index) {
        return Err(LadderError::Locked {
            topic: topic.clone(),
            index,
        });
    }
    Ok(index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Completed,
    Reverted,
}

/// Flip membership of `topic`: present topics are removed, absent ones added once.
pub fn toggle(completed: &mut CompletedTopics, topic: &Topic) -> ToggleKind {
    if completed.remove(topic) {
        ToggleKind::Reverted
    } else {
        completed.insert(topic.clone());
        ToggleKind::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PathName;
    use proptest::prelude::*;

    fn abc() -> TopicSequence {
        TopicSequence::new(
            PathName::css(),
            ["A", "B", "C"].iter().map(|t| Topic::new(*t).unwrap()).collect(),
        )
        .unwrap()
    }

    fn topic(name: &str) -> Topic {
        Topic::new(name).unwrap()
    }

    #[test]
    fn first_topic_is_always_unlocked() {
        let seq = abc();
        assert!(is_unlocked(&seq, &CompletedTopics::new(), 0));
        assert!(!is_unlocked(&seq, &CompletedTopics::new(), 1));
        assert!(!is_unlocked(&seq, &CompletedTopics::new(), 3));
    }

    #[test]
    fn completing_in_order_unlocks_the_chain() {
        let seq = abc();
        let mut completed = CompletedTopics::new();

        assert_eq!(toggle(&mut completed, &topic("A")), ToggleKind::Completed);
        assert!(is_unlocked(&seq, &completed, 1));
        assert!(!is_unlocked(&seq, &completed, 2));

        assert_eq!(toggle(&mut completed, &topic("B")), ToggleKind::Completed);
        assert!(is_unlocked(&seq, &completed, 2));
    }

    #[test]
    fn reverting_a_root_relocks_everything_behind_it() {
        let seq = abc();
        let mut completed: CompletedTopics = [topic("A"), topic("B"), topic("C")].into_iter().collect();

        assert_eq!(toggle(&mut completed, &topic("A")), ToggleKind::Reverted);

        let steps = ladder(&seq, &completed);
        assert_eq!(steps[0].status(), TopicStatus::Available);
        assert_eq!(steps[1].status(), TopicStatus::Locked);
        assert_eq!(steps[2].status(), TopicStatus::Locked);
        assert!(steps[1].completed && steps[2].completed);
        assert!(check_press(&seq, &completed, &topic("B")).is_err());
        assert!(check_press(&seq, &completed, &topic("C")).is_err());
    }

    #[test]
    fn locked_press_is_refused() {
        let seq = abc();
        let err = check_press(&seq, &CompletedTopics::new(), &topic("C")).unwrap_err();
        assert_eq!(
            err,
            LadderError::Locked {
                topic: topic("C"),
                index: 2
            }
        );
    }

    #[test]
    fn unknown_press_is_refused() {
        let seq = abc();
        let err = check_press(&seq, &CompletedTopics::new(), &topic("Z")).unwrap_err();
        assert_eq!(err, LadderError::UnknownTopic(topic("Z")));
    }

    #[test]
    fn double_toggle_restores_set() {
        let mut completed: CompletedTopics = [topic("A")].into_iter().collect();
        let before = completed.clone();
        toggle(&mut completed, &topic("B"));
        toggle(&mut completed, &topic("B"));
        assert_eq!(completed, before);
    }

    proptest! {
        #[test]
        fn unlocked_implies_predecessor_completed(mask in proptest::collection::vec(any::<bool>(), 1..40)) {
            let seq = TopicSequence::new(
                PathName::css(),
                (0..mask.len()).map(|i| Topic::new(format!("T{i}")).unwrap()).collect(),
            ).unwrap();
            let completed: CompletedTopics = seq
                .topics()
                .iter()
                .zip(&mask)
                .filter(|(_, done)| **done)
                .map(|(t, _)| t.clone())
                .collect();

            prop_assert!(is_unlocked(&seq, &completed, 0));
            let steps = ladder(&seq, &completed);
            for index in 1..seq.len() {
                let previous = seq.get(index - 1).unwrap();
                let unlocked = is_unlocked(&seq, &completed, index);
                prop_assert_eq!(unlocked, steps[index].unlocked);
                if unlocked {
                    prop_assert!(completed.contains(previous));
                    prop_assert!(steps[index - 1].unlocked);
                }
            }
        }
    }
}
