mod attempt;
mod ids;
mod progress;
mod session;
mod stats;

pub use attempt::{AttemptError, AttemptResult};
pub use ids::{IdError, QuestionId, SessionId, UserId};
pub use progress::{MasteryLevel, Progress, ProgressError};
pub use session::{
    Difficulty, NewSession, Session, SessionError, SessionStatus, SessionType, SessionUpdate,
};
pub use stats::Stats;
