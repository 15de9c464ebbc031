use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: sessions with their ordered question lists and
/// attempt results, progress keyed per (user, topic, difficulty), and the
/// supporting indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS sessions (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    session_type TEXT NOT NULL,
                    topic TEXT NOT NULL,
                    difficulty TEXT NOT NULL,
                    time_limit_mins INTEGER NOT NULL CHECK (time_limit_mins >= 0),
                    started_at TEXT NOT NULL,
                    ended_at TEXT,
                    total_time_secs INTEGER NOT NULL CHECK (total_time_secs >= 0),
                    status TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                    accuracy REAL NOT NULL CHECK (accuracy BETWEEN 0.0 AND 1.0),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_questions (
                    session_id TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    question_id TEXT NOT NULL,
                    PRIMARY KEY (session_id, position),
                    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempt_results (
                    session_id TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    question_id TEXT NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0),
                    attempts INTEGER NOT NULL CHECK (attempts >= 1),
                    hints_used INTEGER NOT NULL CHECK (hints_used >= 0),
                    solution TEXT,
                    PRIMARY KEY (session_id, position),
                    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    topic TEXT NOT NULL,
                    difficulty TEXT NOT NULL,
                    total_attempted INTEGER NOT NULL CHECK (total_attempted >= 0),
                    total_correct INTEGER NOT NULL CHECK (total_correct >= 0),
                    total_time_secs INTEGER NOT NULL CHECK (total_time_secs >= 0),
                    average_time_secs REAL NOT NULL,
                    accuracy REAL NOT NULL CHECK (accuracy BETWEEN 0.0 AND 1.0),
                    streak INTEGER NOT NULL CHECK (streak >= 0),
                    last_practiced TEXT,
                    mastery TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (user_id, topic, difficulty)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sessions_user_created
                    ON sessions (user_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sessions_user_ended
                    ON sessions (user_id, ended_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_user
                    ON progress (user_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
