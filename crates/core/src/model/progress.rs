use std::collections::HashSet;

use crate::model::{Lesson, LessonId};

/// A student's lessons split into pending and completed.
///
/// `pending` is every lesson minus those referenced by a completion, in the
/// order the lessons were listed. A lesson is never in both halves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LessonProgress {
    pending: Vec<Lesson>,
    completed: Vec<Lesson>,
}

impl LessonProgress {
    /// Partition `lessons` by the ids the student has completed.
    ///
    /// Completion ids that do not match any listed lesson are ignored.
    #[must_use]
    pub fn partition(lessons: Vec<Lesson>, completed_ids: &[LessonId]) -> Self {
        let done: HashSet<&LessonId> = completed_ids.iter().collect();
        let (completed, pending) = lessons
            .into_iter()
            .partition(|lesson| done.contains(lesson.id()));
        Self { pending, completed }
    }

    #[must_use]
    pub fn pending(&self) -> &[Lesson] {
        &self.pending
    }

    #[must_use]
    pub fn completed(&self) -> &[Lesson] {
        &self.completed
    }

    #[must_use]
    pub fn is_pending(&self, id: &LessonId) -> bool {
        self.pending.iter().any(|lesson| lesson.id() == id)
    }

    #[must_use]
    pub fn all_caught_up(&self) -> bool {
        self.pending.is_empty()
    }
}
