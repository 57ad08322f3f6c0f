mod lesson_vm;
mod time_fmt;

pub use lesson_vm::{
    CompletedLessonVm, LessonCardVm, map_completed_lessons, map_lesson_cards,
};
pub use time_fmt::format_datetime;
