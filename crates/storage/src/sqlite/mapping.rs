use prep_core::model::{
    AttemptResult, Difficulty, MasteryLevel, Progress, QuestionId, Session, SessionId,
    SessionStatus, SessionType, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_session_id(s: &str) -> Result<SessionId, StorageError> {
    s.parse::<SessionId>().map_err(ser)
}

pub(crate) fn parse_user_id(s: &str) -> Result<UserId, StorageError> {
    UserId::new(s).map_err(ser)
}

pub(crate) fn parse_uuid(field: &'static str, s: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(s).map_err(|_| StorageError::Serialization(format!("invalid {field}: {s}")))
}

pub(crate) fn parse_session_type(s: &str) -> Result<SessionType, StorageError> {
    match s {
        "practice" => Ok(SessionType::Practice),
        "mock-interview" => Ok(SessionType::MockInterview),
        _ => Err(StorageError::Serialization(format!(
            "invalid session_type: {s}"
        ))),
    }
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    match s {
        "easy" => Ok(Difficulty::Easy),
        "medium" => Ok(Difficulty::Medium),
        "hard" => Ok(Difficulty::Hard),
        _ => Err(StorageError::Serialization(format!(
            "invalid difficulty: {s}"
        ))),
    }
}

pub(crate) fn parse_status(s: &str) -> Result<SessionStatus, StorageError> {
    match s {
        "active" => Ok(SessionStatus::Active),
        "completed" => Ok(SessionStatus::Completed),
        "abandoned" => Ok(SessionStatus::Abandoned),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn parse_mastery(s: &str) -> Result<MasteryLevel, StorageError> {
    match s {
        "beginner" => Ok(MasteryLevel::Beginner),
        "intermediate" => Ok(MasteryLevel::Intermediate),
        "advanced" => Ok(MasteryLevel::Advanced),
        "expert" => Ok(MasteryLevel::Expert),
        _ => Err(StorageError::Serialization(format!("invalid mastery: {s}"))),
    }
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<AttemptResult, StorageError> {
    AttemptResult::new(
        QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?),
        row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
        u32_from_i64(
            "time_spent_secs",
            row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
        )?,
        u32_from_i64("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?,
        u32_from_i64("hints_used", row.try_get::<i64, _>("hints_used").map_err(ser)?)?,
        row.try_get::<Option<String>, _>("solution").map_err(ser)?,
    )
    .map_err(ser)
}

/// Rebuilds a session from its row plus the already-loaded child rows.
pub(crate) fn map_session_row(
    row: &SqliteRow,
    questions: Vec<QuestionId>,
    results: Vec<AttemptResult>,
) -> Result<Session, StorageError> {
    let id = parse_session_id(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let user_id = parse_user_id(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let session_type = parse_session_type(&row.try_get::<String, _>("session_type").map_err(ser)?)?;
    let difficulty = parse_difficulty(&row.try_get::<String, _>("difficulty").map_err(ser)?)?;
    let status = parse_status(&row.try_get::<String, _>("status").map_err(ser)?)?;

    Session::from_persisted(
        id,
        user_id,
        session_type,
        row.try_get::<String, _>("topic").map_err(ser)?,
        difficulty,
        u32_from_i64(
            "time_limit_mins",
            row.try_get::<i64, _>("time_limit_mins").map_err(ser)?,
        )?,
        questions,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("ended_at").map_err(ser)?,
        u32_from_i64(
            "total_time_secs",
            row.try_get::<i64, _>("total_time_secs").map_err(ser)?,
        )?,
        status,
        results,
        u8_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        row.try_get::<f64, _>("accuracy").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<Progress, StorageError> {
    let id = parse_uuid("id", &row.try_get::<String, _>("id").map_err(ser)?)?;
    let user_id = parse_user_id(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let difficulty = parse_difficulty(&row.try_get::<String, _>("difficulty").map_err(ser)?)?;
    let mastery = parse_mastery(&row.try_get::<String, _>("mastery").map_err(ser)?)?;

    Progress::from_persisted(
        id,
        user_id,
        row.try_get::<String, _>("topic").map_err(ser)?,
        difficulty,
        u32_from_i64(
            "total_attempted",
            row.try_get::<i64, _>("total_attempted").map_err(ser)?,
        )?,
        u32_from_i64(
            "total_correct",
            row.try_get::<i64, _>("total_correct").map_err(ser)?,
        )?,
        u64_from_i64(
            "total_time_secs",
            row.try_get::<i64, _>("total_time_secs").map_err(ser)?,
        )?,
        row.try_get::<f64, _>("average_time_secs").map_err(ser)?,
        row.try_get::<f64, _>("accuracy").map_err(ser)?,
        u32_from_i64("streak", row.try_get::<i64, _>("streak").map_err(ser)?)?,
        row.try_get("last_practiced").map_err(ser)?,
        mastery,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}
