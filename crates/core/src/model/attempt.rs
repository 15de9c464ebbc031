use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::QuestionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempts must be at least 1")]
    ZeroAttempts,
}

/// The graded outcome of a single question within a session.
///
/// Immutable once recorded: there are no mutators, and consumers only ever
/// fold attempt results into aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    question_id: QuestionId,
    is_correct: bool,
    time_spent_secs: u32,
    attempts: u32,
    hints_used: u32,
    solution: Option<String>,
}

impl AttemptResult {
    /// Records a graded attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::ZeroAttempts` if `attempts` is 0; answering a
    /// question takes at least one try.
    pub fn new(
        question_id: QuestionId,
        is_correct: bool,
        time_spent_secs: u32,
        attempts: u32,
        hints_used: u32,
        solution: Option<String>,
    ) -> Result<Self, AttemptError> {
        if attempts == 0 {
            return Err(AttemptError::ZeroAttempts);
        }

        Ok(Self {
            question_id,
            is_correct,
            time_spent_secs,
            attempts,
            hints_used,
            solution,
        })
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    #[must_use]
    pub fn solution(&self) -> Option<&str> {
        self.solution.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_a_graded_attempt() {
        let attempt = AttemptResult::new(
            QuestionId::new("two-sum"),
            true,
            60,
            2,
            1,
            Some("fn two_sum() {}".into()),
        )
        .unwrap();

        assert_eq!(attempt.question_id().as_str(), "two-sum");
        assert!(attempt.is_correct());
        assert_eq!(attempt.time_spent_secs(), 60);
        assert_eq!(attempt.attempts(), 2);
        assert_eq!(attempt.hints_used(), 1);
        assert_eq!(attempt.solution(), Some("fn two_sum() {}"));
    }

    #[test]
    fn rejects_zero_attempts() {
        let err =
            AttemptResult::new(QuestionId::new("two-sum"), false, 10, 0, 0, None).unwrap_err();
        assert!(matches!(err, AttemptError::ZeroAttempts));
    }
}
