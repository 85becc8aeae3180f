//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::PracticeSessionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `PracticeSessionService` while saving a session.
///
/// Difficulty adjustment failures are not represented here; they are
/// reported through `AdjustmentReport` instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error(transparent)]
    Session(#[from] PracticeSessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
