use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{Progress, Session, UserId};
use storage::repository::ProgressRepository;

use crate::error::ProgressServiceError;

/// Folds completed sessions into per-(user, topic, difficulty) progress
/// records.
#[derive(Clone)]
pub struct ProgressAggregator {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressAggregator {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Applies a completed session to the matching progress record,
    /// creating the record on first practice of its key.
    ///
    /// Counters only grow, accuracy and average time are recomputed from
    /// the counters, and mastery is reclassified from the new accuracy.
    ///
    /// # Errors
    ///
    /// Propagates `StorageError` from the persistence layer unchanged.
    pub async fn update(
        &self,
        user_id: &UserId,
        session: &Session,
    ) -> Result<Progress, ProgressServiceError> {
        let now = self.clock.now();
        let mut record = self
            .progress
            .get_progress(user_id, session.topic(), session.difficulty())
            .await?
            .unwrap_or_else(|| {
                Progress::new(user_id.clone(), session.topic(), session.difficulty(), now)
            });

        record.record_results(session.results(), now);
        self.progress.upsert_progress(&record).await?;

        tracing::debug!(
            user_id = %user_id,
            topic = session.topic(),
            difficulty = %session.difficulty(),
            attempted = record.total_attempted(),
            mastery = %record.mastery(),
            "progress updated"
        );
        Ok(record)
    }
}
