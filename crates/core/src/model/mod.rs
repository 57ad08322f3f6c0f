mod completion;
mod ids;
mod lesson;
mod progress;
mod session;

pub use ids::{IdError, LessonId, StudentId};

pub use completion::{CompletedLesson, CompletionRecord};
pub use lesson::Lesson;
pub use progress::LessonProgress;
pub use session::{AccessToken, AuthEvent, Session, SessionState, SessionUser};
