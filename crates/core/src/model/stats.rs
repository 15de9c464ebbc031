use serde::Serialize;

use crate::model::Progress;

/// Dashboard-facing summary of a user's practice history.
///
/// Derived on every query from sessions and progress; never persisted and
/// holds no identity of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    /// Correct answers across completed sessions that have results.
    pub total_solved: u32,
    /// Seconds of practice summed over all of the user's sessions.
    pub total_time_secs: u64,
    /// Mean of per-completed-session accuracy, as a rounded 0-100 integer.
    pub accuracy_pct: u8,
    /// Consecutive calendar days with at least one completed session.
    pub streak: u32,
    pub progress: Vec<Progress>,
}

impl Stats {
    /// The summary for a user with no recorded history.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_solved: 0,
            total_time_secs: 0,
            accuracy_pct: 0,
            streak: 0,
            progress: Vec::new(),
        }
    }
}
