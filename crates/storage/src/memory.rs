//! In-memory adapters for tests and prototyping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use lms_core::model::{
    AccessToken, CompletedLesson, CompletionRecord, Lesson, LessonId, Session, SessionUser,
    StudentId,
};

use crate::repository::{
    AuthError, AuthGateway, CompletionRepository, CompletionWrite, LessonRepository,
    NewCompletion, SessionStore, StorageError,
};

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// `lessons` and `completed_lessons` tables held in memory.
///
/// Completions are unique per `(student, lesson)`, matching the backend constraint.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    lessons: Arc<Mutex<Vec<Lesson>>>,
    completions: Arc<Mutex<Vec<CompletionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a lesson row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the table lock is poisoned.
    pub fn put_lesson(&self, lesson: Lesson) -> Result<(), StorageError> {
        let mut guard = self.lessons.lock().map_err(lock_err)?;
        match guard.iter_mut().find(|row| row.id() == lesson.id()) {
            Some(row) => *row = lesson,
            None => guard.push(lesson),
        }
        Ok(())
    }

    /// All completion rows, for assertions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the table lock is poisoned.
    pub fn completion_rows(&self) -> Result<Vec<CompletionRecord>, StorageError> {
        let guard = self.completions.lock().map_err(lock_err)?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn list_lessons(&self, _session: &Session) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lessons.lock().map_err(lock_err)?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn completed_lesson_ids(
        &self,
        session: &Session,
    ) -> Result<Vec<LessonId>, StorageError> {
        let guard = self.completions.lock().map_err(lock_err)?;
        Ok(guard
            .iter()
            .filter(|row| &row.student_id == session.student_id())
            .map(|row| row.lesson_id.clone())
            .collect())
    }

    async fn completed_lessons(
        &self,
        session: &Session,
    ) -> Result<Vec<CompletedLesson>, StorageError> {
        let lessons = self.lessons.lock().map_err(lock_err)?.clone();
        let guard = self.completions.lock().map_err(lock_err)?;

        let mut joined = Vec::new();
        for row in guard
            .iter()
            .filter(|row| &row.student_id == session.student_id())
        {
            match lessons.iter().find(|lesson| lesson.id() == &row.lesson_id) {
                Some(lesson) => joined.push(CompletedLesson::new(lesson.clone(), row.completed_at)),
                None => log::warn!("completion without a visible lesson skipped"),
            }
        }
        joined.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(joined)
    }

    async fn insert_completion(
        &self,
        session: &Session,
        completion: NewCompletion,
    ) -> Result<CompletionWrite, StorageError> {
        let record = completion.into_record(session.student_id().clone());
        let mut guard = self.completions.lock().map_err(lock_err)?;
        if guard.iter().any(|row| row.key() == record.key()) {
            return Ok(CompletionWrite::Duplicate);
        }
        guard.push(record.clone());
        Ok(CompletionWrite::Inserted(record))
    }
}

#[derive(Clone)]
struct Account {
    password: String,
    user: SessionUser,
}

#[derive(Default)]
struct AuthTables {
    accounts: HashMap<String, Account>,
    access: HashMap<String, SessionUser>,
    refresh: HashMap<String, SessionUser>,
    issued: u64,
}

impl AuthTables {
    fn issue(&mut self, user: SessionUser) -> Session {
        self.issued += 1;
        let access = format!("access-{}", self.issued);
        let refresh = format!("refresh-{}", self.issued);
        self.access.insert(access.clone(), user.clone());
        self.refresh.insert(refresh.clone(), user.clone());
        Session::new(user, AccessToken::new(access)).with_refresh_token(refresh)
    }
}

/// Password accounts and issued tokens held in memory.
#[derive(Clone, Default)]
pub struct InMemoryAuth {
    tables: Arc<Mutex<AuthTables>>,
}

impl InMemoryAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a password account that signs in as `id`.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str, id: StudentId) -> Self {
        let user = SessionUser::new(id, Some(email.to_owned()));
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .accounts
            .insert(
                email.to_owned(),
                Account {
                    password: password.to_owned(),
                    user,
                },
            );
        self
    }

    /// Invalidate every issued access and refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Connection` if the auth table lock is poisoned.
    pub fn revoke_all(&self) -> Result<(), AuthError> {
        let mut tables = self.lock()?;
        tables.access.clear();
        tables.refresh.clear();
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, AuthTables>, AuthError> {
        self.tables
            .lock()
            .map_err(|e| AuthError::Connection(e.to_string()))
    }
}

#[async_trait]
impl AuthGateway for InMemoryAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let mut tables = self.lock()?;
        let account = tables
            .accounts
            .get(email)
            .filter(|account| account.password == password)
            .cloned()
            .ok_or_else(|| AuthError::Rejected {
                message: "Invalid login credentials".to_owned(),
            })?;
        Ok(tables.issue(account.user))
    }

    async fn get_user(&self, session: &Session) -> Result<SessionUser, AuthError> {
        let tables = self.lock()?;
        tables
            .access
            .get(session.access_token.expose())
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let token = session
            .refresh_token
            .as_deref()
            .ok_or(AuthError::Unauthorized)?;
        let mut tables = self.lock()?;
        let user = tables.refresh.remove(token).ok_or(AuthError::Unauthorized)?;
        tables.access.remove(session.access_token.expose());
        Ok(tables.issue(user))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let mut tables = self.lock()?;
        tables.access.remove(session.access_token.expose());
        if let Some(token) = session.refresh_token.as_deref() {
            tables.refresh.remove(token);
        }
        Ok(())
    }
}

/// Session store that forgets everything when dropped.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    slot: Arc<Mutex<Option<Session>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        Ok(self.slot.lock().map_err(lock_err)?.clone())
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        *self.slot.lock().map_err(lock_err)? = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock().map_err(lock_err)? = None;
        Ok(())
    }
}
