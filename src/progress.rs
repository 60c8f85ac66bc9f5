//! Progress records handed to persistence after a correct submission

use std::ops::AddAssign;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::exercises::Exercise;
use crate::verifier::VerificationOutcome;

/// What is stored per learner and exercise
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredProgress {
    pub best_stars: u8,
    pub completed: bool,
    /// Latest correct source, overwritten on every correct submission
    pub last_source: Option<String>,
    pub last_elapsed_ms: Option<u64>,
}

impl StoredProgress {
    /// Fold a new record in; best stars never decrease
    pub fn apply(&mut self, record: &ProgressRecord) {
        self.best_stars = self.best_stars.max(record.stars);
        self.completed = true;
        self.last_source = Some(record.source.clone());
        self.last_elapsed_ms = Some(record.elapsed_ms);
    }
}

/// Running totals per learner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerTotals {
    pub stars: u64,
    pub xp: u64,
    pub coins: u64,
}

impl AddAssign for LearnerTotals {
    fn add_assign(&mut self, other: Self) {
        self.stars += other.stars;
        self.xp += other.xp;
        self.coins += other.coins;
    }
}

/// One correct submission, with the deltas to apply to the learner's totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub learner_id: String,
    pub exercise_id: String,
    /// Stars earned by this submission
    pub stars: u8,
    /// Best stars after this submission
    pub best_stars: u8,
    pub stars_to_add: u8,
    pub source: String,
    /// Hex SHA-256 of `source`
    pub source_digest: String,
    pub elapsed_ms: u64,
    pub xp: u32,
    pub coins: u32,
    pub first_completion: bool,
}

impl ProgressRecord {
    /// What this record adds to the learner's running totals
    pub fn totals_delta(&self) -> LearnerTotals {
        LearnerTotals {
            stars: u64::from(self.stars_to_add),
            xp: u64::from(self.xp),
            coins: u64::from(self.coins),
        }
    }
}

pub fn source_digest(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

/// Build the record for a verified submission; `None` unless it was correct.
///
/// Rewards are paid on the first completion only.
pub fn award(
    exercise: &Exercise,
    learner_id: &str,
    previous: Option<&StoredProgress>,
    source: &str,
    outcome: &VerificationOutcome,
) -> Option<ProgressRecord> {
    if !outcome.correct {
        return None;
    }

    let previous_best = previous.map_or(0, |p| p.best_stars);
    let first_completion = !previous.is_some_and(|p| p.completed);

    Some(ProgressRecord {
        learner_id: learner_id.to_string(),
        exercise_id: exercise.id.clone(),
        stars: outcome.stars,
        best_stars: previous_best.max(outcome.stars),
        stars_to_add: outcome.stars.saturating_sub(previous_best),
        source: source.to_string(),
        source_digest: source_digest(source),
        elapsed_ms: outcome.elapsed_ms,
        xp: if first_completion { exercise.xp_reward } else { 0 },
        coins: if first_completion { exercise.coin_reward } else { 0 },
        first_completion,
    })
}

/// Persistence of per-exercise progress and learner totals
#[async_trait]
pub trait ProgressStore: Send {
    async fn load_progress(
        &mut self,
        learner_id: &str,
        exercise_id: &str,
    ) -> Result<Option<StoredProgress>>;

    /// Merge the record into stored progress and add its deltas to the totals
    async fn save_progress(&mut self, record: &ProgressRecord) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Verdict;
    use crate::exercises::embedded;

    fn correct(stars: u8, elapsed_ms: u64) -> VerificationOutcome {
        VerificationOutcome {
            correct: true,
            stars,
            verdict: Verdict::Accepted,
            feedback: String::new(),
            elapsed_ms,
        }
    }

    #[test]
    fn test_incorrect_submission_awards_nothing() {
        let catalog = embedded();
        let exercise = catalog.get("1.1").unwrap();
        let outcome = VerificationOutcome {
            correct: false,
            stars: 0,
            verdict: Verdict::WrongAnswer,
            feedback: "no".into(),
            elapsed_ms: 0,
        };
        assert!(award(exercise, "alice", None, "src", &outcome).is_none());
    }

    #[test]
    fn test_first_completion_pays_rewards() {
        let catalog = embedded();
        let exercise = catalog.get("1.9").unwrap();
        let record = award(exercise, "alice", None, "src", &correct(3, 120_000)).unwrap();
        assert!(record.first_completion);
        assert_eq!(record.xp, 50);
        assert_eq!(record.coins, 20);
        assert_eq!(record.stars_to_add, 3);
        assert_eq!(record.best_stars, 3);
        assert_eq!(record.source_digest.len(), 64);

        let mut totals = LearnerTotals {
            stars: 4,
            xp: 10,
            coins: 1,
        };
        totals += record.totals_delta();
        assert_eq!(
            totals,
            LearnerTotals {
                stars: 7,
                xp: 60,
                coins: 21,
            }
        );
    }

    #[test]
    fn test_best_stars_never_decrease() {
        let catalog = embedded();
        let exercise = catalog.get("1.1").unwrap();

        let mut stored = StoredProgress::default();
        let first = award(exercise, "alice", Some(&stored), "v1", &correct(3, 2 * 60_000)).unwrap();
        stored.apply(&first);

        let second =
            award(exercise, "alice", Some(&stored), "v2", &correct(1, 12 * 60_000)).unwrap();
        assert!(!second.first_completion);
        assert_eq!(second.xp, 0);
        assert_eq!(second.coins, 0);
        assert_eq!(second.stars_to_add, 0);
        assert_eq!(second.best_stars, 3);

        stored.apply(&second);
        assert_eq!(stored.best_stars, 3);
        assert_eq!(stored.last_source.as_deref(), Some("v2"));
        assert_eq!(stored.last_elapsed_ms, Some(12 * 60_000));
    }

    #[test]
    fn test_improvement_adds_the_difference() {
        let catalog = embedded();
        let exercise = catalog.get("1.1").unwrap();
        let stored = StoredProgress {
            best_stars: 1,
            completed: true,
            ..StoredProgress::default()
        };
        let record = award(exercise, "alice", Some(&stored), "v3", &correct(3, 60_000)).unwrap();
        assert_eq!(record.stars_to_add, 2);
        assert_eq!(record.best_stars, 3);
    }

    #[test]
    fn test_source_digest() {
        assert_eq!(
            source_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
