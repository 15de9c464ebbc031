//! Consecutive-day practice streak, counted backward from today.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::model::{Session, SessionStatus};

/// Number of consecutive calendar days, ending today, on which at least one
/// session was completed.
///
/// Only completed sessions with an end time count. Timestamps are truncated
/// to calendar days: several sessions on the same day extend the streak by
/// one, and any gap between days ends the walk. A user whose latest
/// completed session was before today has a streak of 0.
#[must_use]
pub fn consecutive_practice_days(sessions: &[Session], now: DateTime<Utc>) -> u32 {
    let mut ended_days: Vec<_> = sessions
        .iter()
        .filter(|s| s.status() == SessionStatus::Completed)
        .filter_map(Session::ended_at)
        .map(|at| at.date_naive())
        .collect();
    ended_days.sort_unstable_by(|a, b| b.cmp(a));

    let today = now.date_naive();
    let mut streak: u32 = 0;
    for day in ended_days {
        let days_back = (today - day).num_days();
        match days_back.cmp(&i64::from(streak)) {
            // next expected day in the chain
            Ordering::Equal => streak += 1,
            // gap: the chain is broken
            Ordering::Greater => break,
            // another session on an already-counted day
            Ordering::Less => {}
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, NewSession, Session, UserId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn completed_session(ended_at: DateTime<Utc>) -> Session {
        let spec = NewSession::new(UserId::new("user-1").unwrap(), "arrays", Difficulty::Easy);
        let mut session = Session::new(spec, ended_at - Duration::minutes(30)).unwrap();
        session.complete(Vec::new(), ended_at).unwrap();
        session
    }

    fn active_session(started_at: DateTime<Utc>) -> Session {
        let spec = NewSession::new(UserId::new("user-1").unwrap(), "arrays", Difficulty::Easy);
        Session::new(spec, started_at).unwrap()
    }

    #[test]
    fn no_sessions_means_no_streak() {
        assert_eq!(consecutive_practice_days(&[], fixed_now()), 0);
    }

    #[test]
    fn three_consecutive_days_count_as_three() {
        let now = fixed_now();
        let sessions = vec![
            completed_session(now),
            completed_session(now - Duration::days(1)),
            completed_session(now - Duration::days(2)),
        ];
        assert_eq!(consecutive_practice_days(&sessions, now), 3);
    }

    #[test]
    fn a_gap_ends_the_streak() {
        let now = fixed_now();
        let sessions = vec![
            completed_session(now),
            completed_session(now - Duration::days(2)),
        ];
        assert_eq!(consecutive_practice_days(&sessions, now), 1);
    }

    #[test]
    fn same_day_sessions_count_once() {
        let now = fixed_now();
        let sessions = vec![
            completed_session(now),
            completed_session(now - Duration::hours(2)),
            completed_session(now - Duration::days(1)),
        ];
        assert_eq!(consecutive_practice_days(&sessions, now), 2);
    }

    #[test]
    fn streak_requires_a_session_today() {
        let now = fixed_now();
        let sessions = vec![completed_session(now - Duration::days(1))];
        assert_eq!(consecutive_practice_days(&sessions, now), 0);
    }

    #[test]
    fn active_and_abandoned_sessions_are_ignored() {
        let now = fixed_now();
        let mut abandoned = active_session(now - Duration::minutes(30));
        abandoned.abandon(now).unwrap();
        let sessions = vec![active_session(now), abandoned];
        assert_eq!(consecutive_practice_days(&sessions, now), 0);
    }

    #[test]
    fn order_of_input_does_not_matter() {
        let now = fixed_now();
        let sessions = vec![
            completed_session(now - Duration::days(2)),
            completed_session(now),
            completed_session(now - Duration::days(1)),
        ];
        assert_eq!(consecutive_practice_days(&sessions, now), 3);
    }
}
