#![forbid(unsafe_code)]

pub mod error;
pub mod progress_service;
pub mod session_store;
pub mod stats_service;

pub use prep_core::Clock;

pub use error::{ProgressServiceError, SessionStoreError, StatsError};
pub use progress_service::ProgressAggregator;
pub use session_store::SessionStore;
pub use stats_service::StatsComposer;
