use prep_core::model::{Difficulty, Progress, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<Option<Progress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, user_id, topic, difficulty, total_attempted, total_correct,
                    total_time_secs, average_time_secs, accuracy, streak,
                    last_practiced, mastery, updated_at
                FROM progress
                WHERE user_id = ?1 AND topic = ?2 AND difficulty = ?3
            ",
        )
        .bind(user_id.as_str())
        .bind(topic)
        .bind(difficulty.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_progress_row(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO progress (
                    id, user_id, topic, difficulty, total_attempted, total_correct,
                    total_time_secs, average_time_secs, accuracy, streak,
                    last_practiced, mastery, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(user_id, topic, difficulty) DO UPDATE SET
                    total_attempted = excluded.total_attempted,
                    total_correct = excluded.total_correct,
                    total_time_secs = excluded.total_time_secs,
                    average_time_secs = excluded.average_time_secs,
                    accuracy = excluded.accuracy,
                    streak = excluded.streak,
                    last_practiced = excluded.last_practiced,
                    mastery = excluded.mastery,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(progress.id().to_string())
        .bind(progress.user_id().as_str())
        .bind(progress.topic())
        .bind(progress.difficulty().as_str())
        .bind(i64::from(progress.total_attempted()))
        .bind(i64::from(progress.total_correct()))
        .bind(
            i64::try_from(progress.total_time_secs())
                .map_err(|_| StorageError::Serialization("total_time_secs overflow".into()))?,
        )
        .bind(progress.average_time_secs())
        .bind(progress.accuracy())
        .bind(i64::from(progress.streak()))
        .bind(progress.last_practiced())
        .bind(progress.mastery().as_str())
        .bind(progress.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<Progress>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, user_id, topic, difficulty, total_attempted, total_correct,
                    total_time_secs, average_time_secs, accuracy, streak,
                    last_practiced, mastery, updated_at
                FROM progress
                WHERE user_id = ?1
                ORDER BY topic ASC, difficulty ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }
}
