use std::collections::HashMap;

use prep_core::model::{AttemptResult, QuestionId, Session, SessionId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_attempt_row, map_session_row, ser};
use crate::repository::{SessionRepository, StorageError};

fn insert_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn position_i64(position: usize) -> Result<i64, StorageError> {
    i64::try_from(position).map_err(|_| StorageError::Serialization("position overflow".into()))
}

/// Replaces the child rows (ordered questions and attempt results) for a
/// session inside the given transaction.
async fn write_children(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    session: &Session,
) -> Result<(), StorageError> {
    for (position, question) in session.questions().iter().enumerate() {
        sqlx::query(
            r"
                INSERT INTO session_questions (session_id, position, question_id)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(session.id().to_string())
        .bind(position_i64(position)?)
        .bind(question.as_str())
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }

    for (position, result) in session.results().iter().enumerate() {
        sqlx::query(
            r"
                INSERT INTO attempt_results (
                    session_id, position, question_id, is_correct,
                    time_spent_secs, attempts, hints_used, solution
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(session.id().to_string())
        .bind(position_i64(position)?)
        .bind(result.question_id().as_str())
        .bind(i64::from(result.is_correct()))
        .bind(i64::from(result.time_spent_secs()))
        .bind(i64::from(result.attempts()))
        .bind(i64::from(result.hints_used()))
        .bind(result.solution().map(ToOwned::to_owned))
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }

    Ok(())
}

impl SqliteRepository {
    async fn load_questions(&self, session_id: &str) -> Result<Vec<QuestionId>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_id FROM session_questions
                WHERE session_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                Ok(QuestionId::new(
                    row.try_get::<String, _>("question_id").map_err(ser)?,
                ))
            })
            .collect()
    }

    async fn load_results(&self, session_id: &str) -> Result<Vec<AttemptResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_id, is_correct, time_spent_secs, attempts, hints_used, solution
                FROM attempt_results
                WHERE session_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO sessions (
                    id, user_id, session_type, topic, difficulty, time_limit_mins,
                    started_at, ended_at, total_time_secs, status, score, accuracy,
                    created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
        )
        .bind(session.id().to_string())
        .bind(session.user_id().as_str())
        .bind(session.session_type().as_str())
        .bind(session.topic())
        .bind(session.difficulty().as_str())
        .bind(i64::from(session.time_limit_mins()))
        .bind(session.started_at())
        .bind(session.ended_at())
        .bind(i64::from(session.total_time_secs()))
        .bind(session.status().as_str())
        .bind(i64::from(session.score()))
        .bind(session.accuracy())
        .bind(session.created_at())
        .execute(&mut *tx)
        .await
        .map_err(insert_err)?;

        write_children(&mut tx, session).await?;

        tx.commit().await.map_err(conn)
    }

    async fn update_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
                UPDATE sessions SET
                    session_type = ?2,
                    topic = ?3,
                    difficulty = ?4,
                    time_limit_mins = ?5,
                    ended_at = ?6,
                    total_time_secs = ?7,
                    status = ?8,
                    score = ?9,
                    accuracy = ?10
                WHERE id = ?1
            ",
        )
        .bind(session.id().to_string())
        .bind(session.session_type().as_str())
        .bind(session.topic())
        .bind(session.difficulty().as_str())
        .bind(i64::from(session.time_limit_mins()))
        .bind(session.ended_at())
        .bind(i64::from(session.total_time_secs()))
        .bind(session.status().as_str())
        .bind(i64::from(session.score()))
        .bind(session.accuracy())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        sqlx::query("DELETE FROM session_questions WHERE session_id = ?1")
            .bind(session.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        sqlx::query("DELETE FROM attempt_results WHERE session_id = ?1")
            .bind(session.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        write_children(&mut tx, session).await?;

        tx.commit().await.map_err(conn)
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        let id_text = id.to_string();
        let row = sqlx::query(
            r"
                SELECT
                    id, user_id, session_type, topic, difficulty, time_limit_mins,
                    started_at, ended_at, total_time_secs, status, score, accuracy,
                    created_at
                FROM sessions
                WHERE id = ?1
            ",
        )
        .bind(&id_text)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let questions = self.load_questions(&id_text).await?;
        let results = self.load_results(&id_text).await?;
        map_session_row(&row, questions, results)
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<Session>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, user_id, session_type, topic, difficulty, time_limit_mins,
                    started_at, ended_at, total_time_secs, status, score, accuracy,
                    created_at
                FROM sessions
                WHERE user_id = ?1
                ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let question_rows = sqlx::query(
            r"
                SELECT session_id, question_id FROM session_questions
                WHERE session_id IN (SELECT id FROM sessions WHERE user_id = ?1)
                ORDER BY session_id ASC, position ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions_by_session: HashMap<String, Vec<QuestionId>> = HashMap::new();
        for row in &question_rows {
            let session_id: String = row.try_get("session_id").map_err(ser)?;
            let question = QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?);
            questions_by_session.entry(session_id).or_default().push(question);
        }

        let result_rows = sqlx::query(
            r"
                SELECT session_id, question_id, is_correct, time_spent_secs,
                       attempts, hints_used, solution
                FROM attempt_results
                WHERE session_id IN (SELECT id FROM sessions WHERE user_id = ?1)
                ORDER BY session_id ASC, position ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut results_by_session: HashMap<String, Vec<AttemptResult>> = HashMap::new();
        for row in &result_rows {
            let session_id: String = row.try_get("session_id").map_err(ser)?;
            results_by_session
                .entry(session_id)
                .or_default()
                .push(map_attempt_row(row)?);
        }

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let id_text: String = row.try_get("id").map_err(ser)?;
            let questions = questions_by_session.remove(&id_text).unwrap_or_default();
            let results = results_by_session.remove(&id_text).unwrap_or_default();
            sessions.push(map_session_row(row, questions, results)?);
        }

        Ok(sessions)
    }
}
