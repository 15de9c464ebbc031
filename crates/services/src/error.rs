//! Shared error types for the services crate.

use thiserror::Error;

use prep_core::model::SessionError;
use storage::repository::StorageError;

/// Errors emitted by `ProgressAggregator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionStore`.
///
/// Validation failures surface as `Session` (the model rejects bad input),
/// unknown ids as `Storage(StorageError::NotFound)`, and persistence
/// failures as `Storage` unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionStoreError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

/// Errors emitted by `StatsComposer`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
