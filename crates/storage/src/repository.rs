use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_core::model::{
    CompletedLesson, CompletionRecord, Lesson, LessonId, Session, SessionUser, StudentId,
};
use thiserror::Error;

use crate::memory::{InMemoryAuth, InMemoryRepository, InMemorySessionStore};

/// Errors surfaced by table and session-store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("session is not authorized for this request")]
    Unauthorized,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend responded with {status}: {message}")]
    Http { status: u16, message: String },
}

/// Errors surfaced by the auth gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// The auth service refused the request; `message` is its own wording.
    #[error("{message}")]
    Rejected { message: String },

    #[error("session is no longer valid")]
    Unauthorized,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("malformed auth response: {0}")]
    Malformed(String),
}

/// Completion about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompletion {
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
}

impl NewCompletion {
    /// The student always comes from the session, never from the caller.
    #[must_use]
    pub fn into_record(self, student_id: StudentId) -> CompletionRecord {
        CompletionRecord::new(student_id, self.lesson_id, self.completed_at)
    }
}

/// Result of an idempotent completion insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionWrite {
    /// A new record was stored.
    Inserted(CompletionRecord),
    /// A record for the same `(student, lesson)` already existed; nothing changed.
    Duplicate,
}

/// Read access to the `lessons` table.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// List every lesson visible to the session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or the rows are malformed.
    async fn list_lessons(&self, session: &Session) -> Result<Vec<Lesson>, StorageError>;
}

/// Access to the `completed_lessons` table, scoped to the session's student.
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Lesson ids the student has completed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn completed_lesson_ids(&self, session: &Session)
    -> Result<Vec<LessonId>, StorageError>;

    /// Completions joined with their lessons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn completed_lessons(&self, session: &Session)
    -> Result<Vec<CompletedLesson>, StorageError>;

    /// Insert a completion unless one already exists for the pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn insert_completion(
        &self,
        session: &Session,
        completion: NewCompletion,
    ) -> Result<CompletionWrite, StorageError>;
}

/// Credential exchange and token lifecycle against the auth service.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange email + password for a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` with the service's message for bad credentials.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;

    /// Resolve the user behind a session's access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` if the token is no longer accepted.
    async fn get_user(&self, session: &Session) -> Result<SessionUser, AuthError>;

    /// Trade the session's refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if there is no refresh token or the service refuses it.
    async fn refresh(&self, session: &Session) -> Result<Session, AuthError>;

    /// Revoke the session on the service side.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the service cannot be reached.
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// Local persistence of the current session between launches.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the stored row cannot be read or decoded.
    async fn load(&self) -> Result<Option<Session>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be written.
    async fn save(&self, session: &Session) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the stored session cannot be removed.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Aggregates the adapters the services need.
#[derive(Clone)]
pub struct Storage {
    pub lessons: Arc<dyn LessonRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub auth: Arc<dyn AuthGateway>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Storage {
    /// Fully in-memory storage: tables, accounts and session store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::in_memory_with(InMemoryRepository::new(), InMemoryAuth::new())
    }

    /// In-memory storage over pre-populated tables and accounts.
    #[must_use]
    pub fn in_memory_with(repo: InMemoryRepository, auth: InMemoryAuth) -> Self {
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let completions: Arc<dyn CompletionRepository> = Arc::new(repo);
        Self {
            lessons,
            completions,
            auth: Arc::new(auth),
            sessions: Arc::new(InMemorySessionStore::new()),
        }
    }
}
