use async_trait::async_trait;
use prep_core::model::{Difficulty, Progress, Session, SessionId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for session records.
///
/// Sessions are inserted once at creation and rewritten whole on every
/// mutation; the aggregate is small enough that partial-column updates buy
/// nothing.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a newly created session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id already exists, or other
    /// storage errors.
    async fn insert_session(&self, session: &Session) -> Result<(), StorageError>;

    /// Rewrite an existing session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the id is unknown, or other
    /// storage errors.
    async fn update_session(&self, session: &Session) -> Result<(), StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError>;

    /// List all sessions owned by a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<Session>, StorageError>;
}

/// Repository contract for progress records, keyed by
/// (user, topic, difficulty).
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the record for a key, if one exists yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure. A missing record is not
    /// an error; it means the key has never been practiced.
    async fn get_progress(
        &self,
        user_id: &UserId,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<Option<Progress>, StorageError>;

    /// Insert or overwrite the record for its key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError>;

    /// List all progress records for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<Progress>, StorageError>;
}

type ProgressKey = (UserId, String, Difficulty);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    progress: Arc<Mutex<HashMap<ProgressKey, Progress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&session.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if !guard.contains_key(&session.id()) {
            return Err(StorageError::NotFound);
        }
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<Session>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut sessions: Vec<Session> = guard
            .values()
            .filter(|s| s.user_id() == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.created_at(), s.id().as_uuid()));
        Ok(sessions)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<Option<Progress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (user_id.clone(), topic.to_owned(), difficulty);
        Ok(guard.get(&key).cloned())
    }

    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (
            progress.user_id().clone(),
            progress.topic().to_owned(),
            progress.difficulty(),
        );
        guard.insert(key, progress.clone());
        Ok(())
    }

    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<Progress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<Progress> = guard
            .values()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            (a.topic(), a.difficulty()).cmp(&(b.topic(), b.difficulty()))
        });
        Ok(records)
    }
}

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { sessions, progress }
    }
}
