use std::sync::Arc;

use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};
use lms_core::model::{Session, StudentId};
use lms_core::time::fixed_now;
use services::{AppServices, Clock, LessonService, SessionProvider};
use storage::memory::{InMemoryAuth, InMemoryRepository};
use storage::repository::Storage;

use crate::context::{UiApp, build_app_context};
use crate::views::{CompletedView, DashboardView, EntryView, LoginView};

pub const EMAIL: &str = "asha@school.test";
pub const PASSWORD: &str = "pw";

#[derive(Clone)]
struct TestApp {
    services: AppServices,
}

impl UiApp for TestApp {
    fn session(&self) -> Arc<SessionProvider> {
        self.services.session()
    }

    fn lessons(&self) -> Arc<LessonService> {
        self.services.lessons()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Entry,
    Login,
    Dashboard,
    Completed,
}

#[derive(Props, Clone)]
struct ViewHarnessProps {
    app: Arc<TestApp>,
    view: ViewKind,
}

impl PartialEq for ViewHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for ViewHarnessProps {}

#[component]
fn ViewRouterHarness(props: ViewHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    use_context_provider(|| build_app_context(&app));
    use_context_provider(|| props.view);
    rsx! { Router::<TestRoute> {} }
}

// Redirect targets render a marker instead of the real page.
#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum TestRoute {
    #[route("/")]
    Root {},
    #[route("/login")]
    LoginTarget {},
    #[route("/dashboard")]
    DashboardTarget {},
}

#[component]
fn Root() -> Element {
    let view = use_context::<ViewKind>();
    match view {
        ViewKind::Entry => rsx! { EntryView {} },
        ViewKind::Login => rsx! { LoginView {} },
        ViewKind::Dashboard => rsx! { DashboardView {} },
        ViewKind::Completed => rsx! { CompletedView {} },
    }
}

#[component]
fn LoginTarget() -> Element {
    rsx! { p { "redirected:/login" } }
}

#[component]
fn DashboardTarget() -> Element {
    rsx! { p { "redirected:/dashboard" } }
}

pub struct ViewHarness {
    pub dom: VirtualDom,
    pub session: Option<Session>,
    pub provider: Arc<SessionProvider>,
}

impl ViewHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        drive_dom(&mut self.dom);
    }

    pub async fn drive_async(&mut self) {
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            self.dom.wait_for_work(),
        )
        .await;
        self.dom.render_immediate(&mut NoOpMutations);
        self.dom.process_events();
    }

    /// Rebuild and let session lookups, guards and resources settle.
    pub async fn settle(&mut self) {
        self.rebuild();
        self.pump().await;
    }

    /// Let pending notifications and tasks run without rebuilding.
    pub async fn pump(&mut self) {
        for _ in 0..8 {
            self.drive_async().await;
        }
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }
}

pub fn drive_dom(dom: &mut VirtualDom) {
    dom.process_events();
    dom.render_immediate(&mut NoOpMutations);
    dom.process_events();
}

pub fn test_auth() -> InMemoryAuth {
    InMemoryAuth::new().with_account(EMAIL, PASSWORD, StudentId::new("asha").unwrap())
}

/// Build a harness over `storage`, optionally signing the test student in
/// before the first render.
pub async fn setup_view_harness(
    view: ViewKind,
    storage: Storage,
    signed_in: bool,
) -> ViewHarness {
    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    let provider = services.session();
    provider.initialize().await;
    let session = if signed_in {
        Some(provider.sign_in(EMAIL, PASSWORD).await.expect("sign in"))
    } else {
        None
    };

    let app = Arc::new(TestApp { services });
    let dom = VirtualDom::new_with_props(ViewRouterHarness, ViewHarnessProps { app, view });

    ViewHarness {
        dom,
        session,
        provider,
    }
}

/// Lesson service over `storage`, for driving view actions directly.
pub fn lesson_service(storage: &Storage) -> Arc<LessonService> {
    AppServices::from_storage(storage, Clock::fixed(fixed_now())).lessons()
}

/// In-memory storage with the test account and the given repository.
pub fn storage_with(repo: &InMemoryRepository) -> Storage {
    Storage::in_memory_with(repo.clone(), test_auth())
}
