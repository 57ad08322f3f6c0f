use std::sync::Arc;

use storage::remote::{BackendConfig, RemoteBackend};
use storage::repository::Storage;
use storage::sqlite::SqliteSessionStore;

use crate::Clock;
use crate::error::AppServicesError;
use crate::lesson_service::LessonService;
use crate::session_provider::SessionProvider;

/// Assembles the app-facing services over one storage bundle.
#[derive(Clone)]
pub struct AppServices {
    session: Arc<SessionProvider>,
    lessons: Arc<LessonService>,
}

impl AppServices {
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let session = Arc::new(SessionProvider::new(
            clock,
            Arc::clone(&storage.auth),
            Arc::clone(&storage.sessions),
        ));
        let lessons = Arc::new(LessonService::from_storage(clock, storage));
        Self { session, lessons }
    }

    /// Build services against the hosted backend, persisting the session in
    /// the local `SQLite` database at `session_db_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the session database cannot be opened.
    pub async fn connect(
        config: BackendConfig,
        session_db_url: &str,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let sessions = SqliteSessionStore::open(session_db_url).await?;
        log::info!("using backend {}", config.base_url());
        let storage = RemoteBackend::new(config).into_storage(Arc::new(sessions));
        Ok(Self::from_storage(&storage, clock))
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
