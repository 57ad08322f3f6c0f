//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::{AuthError, StorageError};
use storage::sqlite::SqliteInitError;

/// Errors emitted by `SessionProvider`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no active session")]
    NotSignedIn,
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors emitted by `LessonService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonServiceError {
    #[error("this lesson is already being marked as complete")]
    CompletionInFlight,
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
