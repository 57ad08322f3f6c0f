use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use lms_core::Clock;
use lms_core::model::{
    CompletedLesson, CompletionRecord, Lesson, LessonId, LessonProgress, Session, StudentId,
};
use storage::repository::{
    CompletionRepository, CompletionWrite, LessonRepository, NewCompletion, Storage,
};

use crate::error::LessonServiceError;

/// Result of confirming a lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Recorded(CompletionRecord),
    /// The lesson was already complete; no new record was written.
    AlreadyCompleted,
}

type PairKey = (StudentId, LessonId);

/// Holds a `(student, lesson)` pair in the in-flight set until dropped.
struct InFlight {
    set: Arc<Mutex<HashSet<PairKey>>>,
    key: PairKey,
}

impl InFlight {
    fn acquire(set: &Arc<Mutex<HashSet<PairKey>>>, key: PairKey) -> Option<Self> {
        let mut guard = set.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !guard.insert(key.clone()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            key,
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut guard = self
            .set
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.remove(&self.key);
    }
}

/// Reads a student's lessons and records completions.
#[derive(Clone)]
pub struct LessonService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
    completions: Arc<dyn CompletionRepository>,
    in_flight: Arc<Mutex<HashSet<PairKey>>>,
}

impl LessonService {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonRepository>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            clock,
            lessons,
            completions,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.completions),
        )
    }

    /// Every lesson visible to the student.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if the read fails.
    pub async fn list_lessons(&self, session: &Session) -> Result<Vec<Lesson>, LessonServiceError> {
        self.lessons
            .list_lessons(session)
            .await
            .inspect_err(|err| log::error!("error fetching lessons: {err}"))
            .map_err(Into::into)
    }

    /// Ids of the lessons the student has completed.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if the read fails.
    pub async fn completed_lesson_ids(
        &self,
        session: &Session,
    ) -> Result<Vec<LessonId>, LessonServiceError> {
        self.completions
            .completed_lesson_ids(session)
            .await
            .inspect_err(|err| log::error!("error fetching completion ids: {err}"))
            .map_err(Into::into)
    }

    /// Fetch lessons and completions concurrently and split them.
    ///
    /// Both reads must succeed before anything is computed.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if either read fails.
    pub async fn dashboard(&self, session: &Session) -> Result<LessonProgress, LessonServiceError> {
        let (lessons, completed) = tokio::try_join!(
            self.list_lessons(session),
            self.completed_lesson_ids(session)
        )?;
        Ok(LessonProgress::partition(lessons, &completed))
    }

    /// The student's completion history joined with lessons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if the read fails.
    pub async fn completed_lessons(
        &self,
        session: &Session,
    ) -> Result<Vec<CompletedLesson>, LessonServiceError> {
        self.completions
            .completed_lessons(session)
            .await
            .inspect_err(|err| log::error!("error fetching completed lessons: {err}"))
            .map_err(Into::into)
    }

    /// Record that the student finished `lesson_id`, stamped with the clock.
    ///
    /// Idempotent per `(student, lesson)`: repeated confirmations never add a
    /// second record.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::CompletionInFlight` while another
    /// confirmation of the same pair is pending, or
    /// `LessonServiceError::Storage` if the write fails.
    pub async fn confirm_completion(
        &self,
        session: &Session,
        lesson_id: &LessonId,
    ) -> Result<CompletionOutcome, LessonServiceError> {
        let key = (session.student_id().clone(), lesson_id.clone());
        let Some(_in_flight) = InFlight::acquire(&self.in_flight, key) else {
            log::debug!("ignoring repeated confirmation of {lesson_id}");
            return Err(LessonServiceError::CompletionInFlight);
        };

        let completion = NewCompletion {
            lesson_id: lesson_id.clone(),
            completed_at: self.clock.now(),
        };
        match self.completions.insert_completion(session, completion).await {
            Ok(CompletionWrite::Inserted(record)) => {
                log::info!("lesson {lesson_id} marked complete");
                Ok(CompletionOutcome::Recorded(record))
            }
            Ok(CompletionWrite::Duplicate) => Ok(CompletionOutcome::AlreadyCompleted),
            Err(err) => {
                log::error!("error marking lesson {lesson_id} complete: {err}");
                Err(err.into())
            }
        }
    }
}
