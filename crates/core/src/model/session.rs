use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::{AttemptResult, QuestionId, SessionId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("cannot move a {from} session to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("score {score} is out of range 0-100")]
    ScoreOutOfRange { score: u8 },

    #[error("accuracy {accuracy} is out of range 0.0-1.0")]
    AccuracyOutOfRange { accuracy: f64 },
}

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

/// Kind of practice run a session represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    Practice,
    MockInterview,
}

impl SessionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Practice => "practice",
            SessionType::MockInterview => "mock-interview",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question difficulty tier. Part of the progress key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a session.
///
/// Sessions only ever move forward: `Active` to `Completed` or `Abandoned`.
/// Both end states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── NEW SESSION SPEC ──────────────────────────────────────────────────────────
//

/// Input for creating a session. Optional fields fall back to defaults:
/// practice type, no time limit, no preassigned questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub user_id: UserId,
    pub topic: String,
    pub difficulty: Difficulty,
    pub session_type: SessionType,
    pub time_limit_mins: u32,
    pub questions: Vec<QuestionId>,
}

impl NewSession {
    #[must_use]
    pub fn new(user_id: UserId, topic: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            user_id,
            topic: topic.into(),
            difficulty,
            session_type: SessionType::Practice,
            time_limit_mins: 0,
            questions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_session_type(mut self, session_type: SessionType) -> Self {
        self.session_type = session_type;
        self
    }

    /// Time limit in minutes; 0 means unlimited.
    #[must_use]
    pub fn with_time_limit_mins(mut self, mins: u32) -> Self {
        self.time_limit_mins = mins;
        self
    }

    #[must_use]
    pub fn with_questions(mut self, questions: Vec<QuestionId>) -> Self {
        self.questions = questions;
        self
    }
}

//
// ─── SESSION UPDATE ────────────────────────────────────────────────────────────
//

/// Partial update applied to a stored session.
///
/// Only the fields a client legitimately mutates mid-run are here; identity
/// and key fields (user, topic, difficulty) are fixed at creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub ended_at: Option<DateTime<Utc>>,
    pub results: Option<Vec<AttemptResult>>,
    pub total_time_secs: Option<u32>,
    pub score: Option<u8>,
    pub accuracy: Option<f64>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One timed practice or mock-interview run spanning one or more questions.
///
/// Score and accuracy stay at zero while the session is active and are
/// computed exactly once when it completes, from the attached results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    session_type: SessionType,
    topic: String,
    difficulty: Difficulty,
    time_limit_mins: u32,
    questions: Vec<QuestionId>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    total_time_secs: u32,
    status: SessionStatus,
    results: Vec<AttemptResult>,
    score: u8,
    accuracy: f64,
    created_at: DateTime<Utc>,
}

/// Score and accuracy for a finished result set.
///
/// An empty result set grades to (0, 0.0), never NaN.
fn grade_results(results: &[AttemptResult]) -> (u8, f64) {
    if results.is_empty() {
        return (0, 0.0);
    }
    let correct = results.iter().filter(|r| r.is_correct()).count();
    #[allow(clippy::cast_precision_loss)]
    let accuracy = correct as f64 / results.len() as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = (accuracy * 100.0).round() as u8;
    (score, accuracy)
}

impl Session {
    /// Opens a new active session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyTopic` if the topic is empty or
    /// whitespace-only.
    pub fn new(spec: NewSession, now: DateTime<Utc>) -> Result<Self, SessionError> {
        if spec.topic.trim().is_empty() {
            return Err(SessionError::EmptyTopic);
        }

        Ok(Self {
            id: SessionId::generate(),
            user_id: spec.user_id,
            session_type: spec.session_type,
            topic: spec.topic,
            difficulty: spec.difficulty,
            time_limit_mins: spec.time_limit_mins,
            questions: spec.questions,
            started_at: now,
            ended_at: None,
            total_time_secs: 0,
            status: SessionStatus::Active,
            results: Vec::new(),
            score: 0,
            accuracy: 0.0,
            created_at: now,
        })
    }

    /// Rehydrates a session from persisted storage without re-running
    /// completion.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the stored topic, score, or accuracy fail
    /// validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        user_id: UserId,
        session_type: SessionType,
        topic: String,
        difficulty: Difficulty,
        time_limit_mins: u32,
        questions: Vec<QuestionId>,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        total_time_secs: u32,
        status: SessionStatus,
        results: Vec<AttemptResult>,
        score: u8,
        accuracy: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if topic.trim().is_empty() {
            return Err(SessionError::EmptyTopic);
        }
        if score > 100 {
            return Err(SessionError::ScoreOutOfRange { score });
        }
        if !(0.0..=1.0).contains(&accuracy) {
            return Err(SessionError::AccuracyOutOfRange { accuracy });
        }

        Ok(Self {
            id,
            user_id,
            session_type,
            topic,
            difficulty,
            time_limit_mins,
            questions,
            started_at,
            ended_at,
            total_time_secs,
            status,
            results,
            score,
            accuracy,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Time limit in minutes; 0 means unlimited.
    #[must_use]
    pub fn time_limit_mins(&self) -> u32 {
        self.time_limit_mins
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionId] {
        &self.questions
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn total_time_secs(&self) -> u32 {
        self.total_time_secs
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn results(&self) -> &[AttemptResult] {
        &self.results
    }

    /// Rounded 0-100 score; 0 until the session completes.
    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    /// Fraction of correct results in 0.0-1.0; 0.0 until the session
    /// completes.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Count of correct results recorded so far.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_correct()).count()
    }

    fn ensure_active(&self, to: SessionStatus) -> Result<(), SessionError> {
        if self.status == SessionStatus::Active {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }

    /// Completes the session: attaches the results, stamps the end time,
    /// and grades score and accuracy.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is
    /// still active. Grading happens exactly once.
    pub fn complete(
        &mut self,
        results: Vec<AttemptResult>,
        ended_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_active(SessionStatus::Completed)?;

        let (score, accuracy) = grade_results(&results);
        self.results = results;
        self.ended_at = Some(ended_at);
        self.status = SessionStatus::Completed;
        self.score = score;
        self.accuracy = accuracy;
        Ok(())
    }

    /// Abandons the session without grading it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is
    /// still active.
    pub fn abandon(&mut self, at: DateTime<Utc>) -> Result<(), SessionError> {
        self.ensure_active(SessionStatus::Abandoned)?;

        self.status = SessionStatus::Abandoned;
        self.ended_at = Some(at);
        Ok(())
    }

    /// Merges a partial update into the session.
    ///
    /// Status changes go through the state machine: leaving a terminal
    /// state is rejected. The other fields merge as given, with range
    /// checks on score and accuracy.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` for an illegal status
    /// change, or a range error for out-of-bounds score/accuracy.
    pub fn apply_update(&mut self, update: SessionUpdate) -> Result<(), SessionError> {
        if let Some(status) = update.status {
            if status != self.status {
                self.ensure_active(status)?;
                self.status = status;
            }
        }
        if let Some(score) = update.score {
            if score > 100 {
                return Err(SessionError::ScoreOutOfRange { score });
            }
            self.score = score;
        }
        if let Some(accuracy) = update.accuracy {
            if !(0.0..=1.0).contains(&accuracy) {
                return Err(SessionError::AccuracyOutOfRange { accuracy });
            }
            self.accuracy = accuracy;
        }
        if let Some(ended_at) = update.ended_at {
            self.ended_at = Some(ended_at);
        }
        if let Some(results) = update.results {
            self.results = results;
        }
        if let Some(total_time_secs) = update.total_time_secs {
            self.total_time_secs = total_time_secs;
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn attempt(question: &str, is_correct: bool, time_spent_secs: u32) -> AttemptResult {
        AttemptResult::new(
            QuestionId::new(question),
            is_correct,
            time_spent_secs,
            1,
            0,
            None,
        )
        .unwrap()
    }

    fn open_session() -> Session {
        let spec = NewSession::new(
            UserId::new("user-1").unwrap(),
            "arrays",
            Difficulty::Easy,
        );
        Session::new(spec, fixed_now()).unwrap()
    }

    #[test]
    fn new_session_starts_active_with_defaults() {
        let session = open_session();

        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.session_type(), SessionType::Practice);
        assert_eq!(session.time_limit_mins(), 0);
        assert!(session.questions().is_empty());
        assert!(session.results().is_empty());
        assert_eq!(session.score(), 0);
        assert_eq!(session.accuracy(), 0.0);
        assert_eq!(session.started_at(), fixed_now());
        assert_eq!(session.created_at(), fixed_now());
        assert!(session.ended_at().is_none());
    }

    #[test]
    fn new_session_rejects_blank_topic() {
        let spec = NewSession::new(UserId::new("user-1").unwrap(), "  ", Difficulty::Easy);
        let err = Session::new(spec, fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::EmptyTopic));
    }

    #[test]
    fn builder_overrides_defaults() {
        let spec = NewSession::new(UserId::new("user-1").unwrap(), "graphs", Difficulty::Hard)
            .with_session_type(SessionType::MockInterview)
            .with_time_limit_mins(45)
            .with_questions(vec![QuestionId::new("clone-graph")]);
        let session = Session::new(spec, fixed_now()).unwrap();

        assert_eq!(session.session_type(), SessionType::MockInterview);
        assert_eq!(session.time_limit_mins(), 45);
        assert_eq!(session.questions().len(), 1);
    }

    #[test]
    fn complete_grades_exactly_once() {
        let mut session = open_session();
        let end = fixed_now() + chrono::Duration::minutes(10);
        session
            .complete(vec![attempt("a", true, 60), attempt("b", false, 90)], end)
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.ended_at(), Some(end));
        assert_eq!(session.score(), 50);
        assert_eq!(session.accuracy(), 0.5);

        let err = session.complete(vec![attempt("c", true, 5)], end).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                from: SessionStatus::Completed,
                to: SessionStatus::Completed,
            }
        ));
        // grading untouched by the failed second call
        assert_eq!(session.score(), 50);
    }

    #[test]
    fn score_rounds_to_nearest_integer() {
        let mut session = open_session();
        session
            .complete(
                vec![attempt("a", true, 10), attempt("b", true, 10), attempt("c", false, 10)],
                fixed_now(),
            )
            .unwrap();
        assert_eq!(session.score(), 67);
    }

    #[test]
    fn empty_results_grade_to_zero_not_nan() {
        let mut session = open_session();
        session.complete(Vec::new(), fixed_now()).unwrap();

        assert_eq!(session.score(), 0);
        assert_eq!(session.accuracy(), 0.0);
    }

    #[test]
    fn abandon_is_terminal() {
        let mut session = open_session();
        session.abandon(fixed_now()).unwrap();

        assert_eq!(session.status(), SessionStatus::Abandoned);
        assert_eq!(session.ended_at(), Some(fixed_now()));

        let err = session.complete(Vec::new(), fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
    }

    #[test]
    fn update_merges_mutable_fields() {
        let mut session = open_session();
        session
            .apply_update(SessionUpdate {
                total_time_secs: Some(300),
                results: Some(vec![attempt("a", true, 30)]),
                ..SessionUpdate::default()
            })
            .unwrap();

        assert_eq!(session.total_time_secs(), 300);
        assert_eq!(session.results().len(), 1);
        // untouched fields keep their values
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn update_rejects_leaving_a_terminal_state() {
        let mut session = open_session();
        session.abandon(fixed_now()).unwrap();

        let err = session
            .apply_update(SessionUpdate {
                status: Some(SessionStatus::Active),
                ..SessionUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                from: SessionStatus::Abandoned,
                to: SessionStatus::Active,
            }
        ));
    }

    #[test]
    fn update_rejects_out_of_range_values() {
        let mut session = open_session();
        let err = session
            .apply_update(SessionUpdate {
                score: Some(101),
                ..SessionUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::ScoreOutOfRange { score: 101 }));

        let err = session
            .apply_update(SessionUpdate {
                accuracy: Some(1.5),
                ..SessionUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::AccuracyOutOfRange { .. }));
    }
}
