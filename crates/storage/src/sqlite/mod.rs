use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{ProgressRepository, SessionRepository, Storage};

mod mapping;
mod migrate;
mod progress_repo;
mod session_repo;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("invalid sqlite url: {0}")]
    InvalidUrl(sqlx::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// `SQLite`-backed implementation of the repository traits.
///
/// One pool serves both the session and progress tables; the repository is
/// cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens a pool against the given `SQLite` URL, with foreign keys on,
    /// WAL journaling, and a busy timeout on every connection.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::InvalidUrl` for a URL `SQLite` cannot
    /// parse, or `Sqlx` if the pool cannot be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(SqliteInitError::InvalidUrl)?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Brings the schema up to the current version.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Connects to `SQLite`, migrates, and wires both repositories to the
    /// shared pool.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migration fails.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Ok(Self { sessions, progress })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let repo =
            SqliteRepository::connect("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
                .await
                .expect("connect");
        repo.migrate().await.expect("first run");
        repo.migrate().await.expect("second run");
    }
}
