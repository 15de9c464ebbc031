use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{AttemptResult, NewSession, Session, SessionId, SessionUpdate};
use storage::repository::SessionRepository;

use crate::error::SessionStoreError;
use crate::progress_service::ProgressAggregator;

/// Creates, mutates, and finalizes sessions.
///
/// Ending a session is the one compound operation in the core: the session
/// is graded and persisted, then the progress aggregate for its
/// (user, topic, difficulty) key is brought up to date.
#[derive(Clone)]
pub struct SessionStore {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    aggregator: ProgressAggregator,
}

impl SessionStore {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        aggregator: ProgressAggregator,
    ) -> Self {
        Self {
            clock,
            sessions,
            aggregator,
        }
    }

    /// Opens a new active session and persists it.
    ///
    /// # Errors
    ///
    /// Returns `SessionStoreError::Session` for invalid input (blank
    /// topic), or `Storage` on persistence failure.
    pub async fn create(&self, spec: NewSession) -> Result<Session, SessionStoreError> {
        let session = Session::new(spec, self.clock.now())?;
        self.sessions.insert_session(&session).await?;

        tracing::debug!(
            session_id = %session.id(),
            user_id = %session.user_id(),
            topic = session.topic(),
            "session created"
        );
        Ok(session)
    }

    /// Merges a partial update into a stored session and persists it.
    ///
    /// # Errors
    ///
    /// Returns `Storage(StorageError::NotFound)` for an unknown id,
    /// `Session` for an illegal status transition or out-of-range values,
    /// or `Storage` on persistence failure.
    pub async fn update(
        &self,
        id: SessionId,
        update: SessionUpdate,
    ) -> Result<Session, SessionStoreError> {
        let mut session = self.sessions.get_session(id).await?;
        session.apply_update(update)?;
        self.sessions.update_session(&session).await?;
        Ok(session)
    }

    /// Abandons an active session without grading it.
    ///
    /// # Errors
    ///
    /// Returns `Storage(StorageError::NotFound)` for an unknown id, or
    /// `Session` if the session already ended.
    pub async fn abandon(&self, id: SessionId) -> Result<Session, SessionStoreError> {
        let mut session = self.sessions.get_session(id).await?;
        session.abandon(self.clock.now())?;
        self.sessions.update_session(&session).await?;

        tracing::debug!(session_id = %session.id(), "session abandoned");
        Ok(session)
    }

    /// Completes a session with its collected results, then updates the
    /// matching progress record as a side effect.
    ///
    /// # Errors
    ///
    /// Returns `Storage(StorageError::NotFound)` for an unknown id,
    /// `Session` if the session already ended, `Storage` on persistence
    /// failure, or `Progress` if the follow-up aggregation fails (the
    /// completed session is persisted either way).
    pub async fn end(
        &self,
        id: SessionId,
        results: Vec<AttemptResult>,
    ) -> Result<Session, SessionStoreError> {
        let mut session = self.sessions.get_session(id).await?;
        session.complete(results, self.clock.now())?;
        self.sessions.update_session(&session).await?;

        let user_id = session.user_id().clone();
        self.aggregator.update(&user_id, &session).await?;

        tracing::info!(
            session_id = %session.id(),
            user_id = %user_id,
            score = session.score(),
            "session completed"
        );
        Ok(session)
    }
}
