use lms_core::model::{CompletedLesson, Lesson, LessonId};

use crate::vm::time_fmt::format_datetime;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LessonCardVm {
    pub id: LessonId,
    pub title: String,
    pub description: String,
}

impl From<&Lesson> for LessonCardVm {
    fn from(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id().clone(),
            title: lesson.title().to_string(),
            description: lesson.description().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedLessonVm {
    pub id: LessonId,
    pub title: String,
    pub description: String,
    pub completed_at_str: String,
}

impl From<&CompletedLesson> for CompletedLessonVm {
    fn from(item: &CompletedLesson) -> Self {
        Self {
            id: item.lesson.id().clone(),
            title: item.lesson.title().to_string(),
            description: item.lesson.description().to_string(),
            completed_at_str: format_datetime(item.completed_at),
        }
    }
}

#[must_use]
pub fn map_lesson_cards(lessons: &[Lesson]) -> Vec<LessonCardVm> {
    lessons.iter().map(LessonCardVm::from).collect()
}

#[must_use]
pub fn map_completed_lessons(items: &[CompletedLesson]) -> Vec<CompletedLessonVm> {
    items.iter().map(CompletedLessonVm::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::time::fixed_now;

    #[test]
    fn completed_lesson_carries_display_time() {
        let lesson = Lesson::new(LessonId::new("l-1").unwrap(), "Fractions", "Parts of a whole");
        let vm = CompletedLessonVm::from(&CompletedLesson::new(lesson, fixed_now()));

        assert_eq!(vm.title, "Fractions");
        assert_eq!(vm.completed_at_str, "15/11/2023, 03:43 am");
    }
}
