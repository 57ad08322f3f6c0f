use std::sync::Arc;

use services::{LessonService, SessionProvider};

pub trait UiApp: Send + Sync {
    fn session(&self) -> Arc<SessionProvider>;
    fn lessons(&self) -> Arc<LessonService>;
}

#[derive(Clone)]
pub struct AppContext {
    session: Arc<SessionProvider>,
    lessons: Arc<LessonService>,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            session: app.session(),
            lessons: app.lessons(),
        }
    }

    #[must_use]
    pub fn session(&self) -> Arc<SessionProvider> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
    }
}

// Provided by the composition root (`crates/app`) or the view test harness.

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
