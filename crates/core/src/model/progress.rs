use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{AttemptResult, Difficulty, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("total correct ({correct}) exceeds total attempted ({attempted})")]
    CorrectExceedsAttempted { correct: u32, attempted: u32 },
}

//
// ─── MASTERY LEVEL ─────────────────────────────────────────────────────────────
//

/// Four-tier classification derived solely from rolling accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MasteryLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl MasteryLevel {
    /// Classifies an accuracy value. Thresholds are inclusive at the lower
    /// bound of each tier, checked highest-first: >= 0.8 expert, >= 0.6
    /// advanced, >= 0.4 intermediate, anything below beginner.
    #[must_use]
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 0.8 {
            MasteryLevel::Expert
        } else if accuracy >= 0.6 {
            MasteryLevel::Advanced
        } else if accuracy >= 0.4 {
            MasteryLevel::Intermediate
        } else {
            MasteryLevel::Beginner
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MasteryLevel::Beginner => "beginner",
            MasteryLevel::Intermediate => "intermediate",
            MasteryLevel::Advanced => "advanced",
            MasteryLevel::Expert => "expert",
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Rolling per-user, per-topic, per-difficulty aggregate of attempt history.
///
/// At most one record exists per (user, topic, difficulty) key. Counters
/// only ever grow; accuracy, average time, and mastery are recomputed from
/// the counters after every fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    id: Uuid,
    user_id: UserId,
    topic: String,
    difficulty: Difficulty,
    total_attempted: u32,
    total_correct: u32,
    total_time_secs: u64,
    average_time_secs: f64,
    accuracy: f64,
    streak: u32,
    last_practiced: Option<DateTime<Utc>>,
    mastery: MasteryLevel,
    updated_at: DateTime<Utc>,
}

impl Progress {
    /// Initializes an empty record for a key that has never been practiced.
    #[must_use]
    pub fn new(
        user_id: UserId,
        topic: impl Into<String>,
        difficulty: Difficulty,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            topic: topic.into(),
            difficulty,
            total_attempted: 0,
            total_correct: 0,
            total_time_secs: 0,
            average_time_secs: 0.0,
            accuracy: 0.0,
            streak: 0,
            last_practiced: None,
            mastery: MasteryLevel::Beginner,
            updated_at: now,
        }
    }

    /// Rehydrates a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CorrectExceedsAttempted` if the stored
    /// counters do not align.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: Uuid,
        user_id: UserId,
        topic: String,
        difficulty: Difficulty,
        total_attempted: u32,
        total_correct: u32,
        total_time_secs: u64,
        average_time_secs: f64,
        accuracy: f64,
        streak: u32,
        last_practiced: Option<DateTime<Utc>>,
        mastery: MasteryLevel,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if total_correct > total_attempted {
            return Err(ProgressError::CorrectExceedsAttempted {
                correct: total_correct,
                attempted: total_attempted,
            });
        }

        Ok(Self {
            id,
            user_id,
            topic,
            difficulty,
            total_attempted,
            total_correct,
            total_time_secs,
            average_time_secs,
            accuracy,
            streak,
            last_practiced,
            mastery,
            updated_at,
        })
    }

    /// Folds one completed session's results into the record and refreshes
    /// the derived fields and timestamps.
    pub fn record_results(&mut self, results: &[AttemptResult], now: DateTime<Utc>) {
        for result in results {
            self.total_attempted = self.total_attempted.saturating_add(1);
            if result.is_correct() {
                self.total_correct = self.total_correct.saturating_add(1);
            }
            self.total_time_secs = self
                .total_time_secs
                .saturating_add(u64::from(result.time_spent_secs()));
        }

        self.recompute_derived();
        self.last_practiced = Some(now);
        self.updated_at = now;
    }

    fn recompute_derived(&mut self) {
        if self.total_attempted == 0 {
            self.accuracy = 0.0;
            self.average_time_secs = 0.0;
        } else {
            self.accuracy = f64::from(self.total_correct) / f64::from(self.total_attempted);
            #[allow(clippy::cast_precision_loss)]
            {
                self.average_time_secs =
                    self.total_time_secs as f64 / f64::from(self.total_attempted);
            }
        }
        self.mastery = MasteryLevel::from_accuracy(self.accuracy);
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn total_attempted(&self) -> u32 {
        self.total_attempted
    }

    #[must_use]
    pub fn total_correct(&self) -> u32 {
        self.total_correct
    }

    #[must_use]
    pub fn total_time_secs(&self) -> u64 {
        self.total_time_secs
    }

    #[must_use]
    pub fn average_time_secs(&self) -> f64 {
        self.average_time_secs
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Persisted streak counter. The authoritative streak is derived from
    /// session history; this field is carried through storage untouched.
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn last_practiced(&self) -> Option<DateTime<Utc>> {
        self.last_practiced
    }

    #[must_use]
    pub fn mastery(&self) -> MasteryLevel {
        self.mastery
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
