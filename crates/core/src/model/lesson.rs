use serde::{Deserialize, Serialize};

use crate::model::LessonId;

/// A unit of instructional content.
///
/// Lessons are authored outside the client; the client only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    id: LessonId,
    title: String,
    description: String,
}

impl Lesson {
    #[must_use]
    pub fn new(id: LessonId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}
