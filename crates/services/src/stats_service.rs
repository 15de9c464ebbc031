use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{Session, SessionStatus, Stats, UserId};
use prep_core::streak::consecutive_practice_days;
use storage::repository::{ProgressRepository, SessionRepository};

use crate::error::StatsError;

/// Mean of per-session accuracy as a rounded 0-100 integer.
///
/// Each session contributes its own correct/attempted ratio; this is not a
/// recompute from raw counts, so sessions of different lengths weigh the
/// same.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn mean_accuracy_pct(sessions: &[&Session]) -> u8 {
    if sessions.is_empty() {
        return 0;
    }
    let mean = sessions.iter().map(|s| s.accuracy()).sum::<f64>() / sessions.len() as f64;
    (mean * 100.0).round() as u8
}

/// Combines sessions, progress, and the streak into one dashboard summary.
#[derive(Clone)]
pub struct StatsComposer {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl StatsComposer {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            sessions,
            progress,
        }
    }

    /// Recomputes the user's stats from scratch. Pure read: calling it
    /// twice without intervening writes yields identical output.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` on repository failures.
    pub async fn compute(&self, user_id: &UserId) -> Result<Stats, StatsError> {
        let sessions = self.sessions.list_sessions(user_id).await?;
        let progress = self.progress.list_progress(user_id).await?;

        let graded: Vec<&Session> = sessions
            .iter()
            .filter(|s| s.status() == SessionStatus::Completed && !s.results().is_empty())
            .collect();

        let solved: usize = graded.iter().map(|s| s.correct_count()).sum();
        let total_time_secs = sessions
            .iter()
            .map(|s| u64::from(s.total_time_secs()))
            .sum();

        Ok(Stats {
            total_solved: u32::try_from(solved).unwrap_or(u32::MAX),
            total_time_secs,
            accuracy_pct: mean_accuracy_pct(&graded),
            streak: consecutive_practice_days(&sessions, self.clock.now()),
            progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prep_core::model::{AttemptResult, Difficulty, NewSession, QuestionId, SessionUpdate};
    use prep_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn attempt(is_correct: bool) -> AttemptResult {
        AttemptResult::new(QuestionId::new("q"), is_correct, 60, 1, 0, None).unwrap()
    }

    fn build_composer(repo: &InMemoryRepository) -> StatsComposer {
        StatsComposer::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    async fn insert_completed(
        repo: &InMemoryRepository,
        results: Vec<AttemptResult>,
        total_time_secs: u32,
        ended_at: chrono::DateTime<chrono::Utc>,
    ) {
        use storage::repository::SessionRepository as _;
        let spec = NewSession::new(user(), "arrays", Difficulty::Easy);
        let mut session = Session::new(spec, ended_at - Duration::minutes(30)).unwrap();
        session
            .apply_update(SessionUpdate {
                total_time_secs: Some(total_time_secs),
                ..SessionUpdate::default()
            })
            .unwrap();
        session.complete(results, ended_at).unwrap();
        repo.insert_session(&session).await.unwrap();
    }

    #[tokio::test]
    async fn no_history_yields_zeroed_stats() {
        let repo = InMemoryRepository::new();
        let composer = build_composer(&repo);

        let stats = composer.compute(&user()).await.unwrap();
        assert_eq!(stats, Stats::empty());
    }

    #[tokio::test]
    async fn totals_and_accuracy_come_from_graded_sessions() {
        let repo = InMemoryRepository::new();
        let composer = build_composer(&repo);

        // 2/2 correct, then 1/2 correct: mean accuracy (1.0 + 0.5) / 2
        insert_completed(
            &repo,
            vec![attempt(true), attempt(true)],
            300,
            fixed_now(),
        )
        .await;
        insert_completed(
            &repo,
            vec![attempt(true), attempt(false)],
            600,
            fixed_now() - Duration::hours(1),
        )
        .await;

        let stats = composer.compute(&user()).await.unwrap();
        assert_eq!(stats.total_solved, 3);
        assert_eq!(stats.total_time_secs, 900);
        assert_eq!(stats.accuracy_pct, 75);
        assert_eq!(stats.streak, 1);
    }

    #[tokio::test]
    async fn resultless_and_unfinished_sessions_do_not_skew_accuracy() {
        let repo = InMemoryRepository::new();
        let composer = build_composer(&repo);

        insert_completed(&repo, vec![attempt(true)], 120, fixed_now()).await;
        // completed but empty: counts for time, not for accuracy
        insert_completed(&repo, Vec::new(), 60, fixed_now()).await;
        // still active: counts for time only
        {
            use storage::repository::SessionRepository as _;
            let spec = NewSession::new(user(), "graphs", Difficulty::Hard);
            let mut active = Session::new(spec, fixed_now()).unwrap();
            active
                .apply_update(SessionUpdate {
                    total_time_secs: Some(30),
                    ..SessionUpdate::default()
                })
                .unwrap();
            repo.insert_session(&active).await.unwrap();
        }

        let stats = composer.compute(&user()).await.unwrap();
        assert_eq!(stats.total_solved, 1);
        assert_eq!(stats.total_time_secs, 210);
        assert_eq!(stats.accuracy_pct, 100);
    }

    #[tokio::test]
    async fn compute_is_idempotent() {
        let repo = InMemoryRepository::new();
        let composer = build_composer(&repo);
        insert_completed(&repo, vec![attempt(true), attempt(false)], 300, fixed_now()).await;

        let first = composer.compute(&user()).await.unwrap();
        let second = composer.compute(&user()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn streak_walks_consecutive_days() {
        let repo = InMemoryRepository::new();
        let composer = build_composer(&repo);

        insert_completed(&repo, vec![attempt(true)], 60, fixed_now()).await;
        insert_completed(&repo, vec![attempt(true)], 60, fixed_now() - Duration::days(1)).await;
        insert_completed(&repo, vec![attempt(true)], 60, fixed_now() - Duration::days(2)).await;
        // beyond the gap at day 3: ignored
        insert_completed(&repo, vec![attempt(true)], 60, fixed_now() - Duration::days(5)).await;

        let stats = composer.compute(&user()).await.unwrap();
        assert_eq!(stats.streak, 3);
    }
}
