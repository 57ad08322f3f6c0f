use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Lesson, LessonId, StudentId};

/// A fact stating that a student finished a lesson at a given time.
///
/// At most one record exists per `(student_id, lesson_id)`; writers treat the
/// pair as the record's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    #[must_use]
    pub fn new(student_id: StudentId, lesson_id: LessonId, completed_at: DateTime<Utc>) -> Self {
        Self {
            student_id,
            lesson_id,
            completed_at,
        }
    }

    /// Returns the uniqueness key of the record.
    #[must_use]
    pub fn key(&self) -> (&StudentId, &LessonId) {
        (&self.student_id, &self.lesson_id)
    }
}

/// A completion joined with the lesson it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedLesson {
    pub lesson: Lesson,
    pub completed_at: DateTime<Utc>,
}

impl CompletedLesson {
    #[must_use]
    pub fn new(lesson: Lesson, completed_at: DateTime<Utc>) -> Self {
        Self {
            lesson,
            completed_at,
        }
    }
}
