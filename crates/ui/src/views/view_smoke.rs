use std::sync::Arc;

use dioxus::prelude::*;
use lms_core::model::{CompletedLesson, Lesson, LessonId, Session};
use lms_core::time::fixed_now;
use storage::memory::InMemoryRepository;
use storage::repository::{
    AuthGateway, CompletionRepository, CompletionWrite, LessonRepository, NewCompletion,
    StorageError,
};

use super::ViewError;
use super::dashboard::{ConfirmDialog, ConfirmState, record_completion};
use super::test_harness::{
    EMAIL, PASSWORD, ViewKind, lesson_service, setup_view_harness, storage_with,
};
use crate::vm::LessonCardVm;

fn seeded_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    for (id, title) in [("l-1", "Fractions"), ("l-2", "Decimals"), ("l-3", "Percentages")] {
        let lesson = Lesson::new(LessonId::new(id).unwrap(), title, format!("All about {title}"));
        repo.put_lesson(lesson).unwrap();
    }
    repo
}

async fn complete(repo: &InMemoryRepository, session: &Session, id: &str) {
    repo.insert_completion(
        session,
        NewCompletion {
            lesson_id: LessonId::new(id).unwrap(),
            completed_at: fixed_now(),
        },
    )
    .await
    .expect("insert completion");
}

#[tokio::test(flavor = "current_thread")]
async fn dashboard_view_smoke_renders_pending_lessons() {
    let repo = seeded_repo();
    let mut harness =
        setup_view_harness(ViewKind::Dashboard, storage_with(&repo), true).await;
    let session = harness.session.clone().expect("session");
    complete(&repo, &session, "l-2").await;

    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("Welcome,"), "missing greeting in {html}");
    assert!(html.contains("asha@school.test"), "missing email in {html}");
    assert!(html.contains("Fractions"), "missing pending lesson in {html}");
    assert!(html.contains("Percentages"), "missing pending lesson in {html}");
    assert!(!html.contains("Decimals"), "completed lesson shown as pending in {html}");
    assert_eq!(html.matches("Mark as Complete").count(), 2, "{html}");
}

#[tokio::test(flavor = "current_thread")]
async fn dashboard_view_smoke_renders_caught_up_state() {
    let repo = seeded_repo();
    let mut harness =
        setup_view_harness(ViewKind::Dashboard, storage_with(&repo), true).await;
    let session = harness.session.clone().expect("session");
    for id in ["l-1", "l-2", "l-3"] {
        complete(&repo, &session, id).await;
    }

    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("all caught up"), "missing empty state in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn completed_view_smoke_renders_display_time() {
    let repo = seeded_repo();
    let mut harness =
        setup_view_harness(ViewKind::Completed, storage_with(&repo), true).await;
    let session = harness.session.clone().expect("session");
    complete(&repo, &session, "l-1").await;

    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("Completed Lessons"), "missing title in {html}");
    assert!(html.contains("Fractions"), "missing lesson in {html}");
    assert!(
        html.contains("Completed on 15/11/2023, 03:43 am"),
        "missing display time in {html}"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn completed_view_smoke_renders_empty_state() {
    let repo = seeded_repo();
    let mut harness =
        setup_view_harness(ViewKind::Completed, storage_with(&repo), true).await;

    harness.settle().await;
    let html = harness.render();
    assert!(
        html.contains("completed any lessons yet"),
        "missing empty state in {html}"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn signed_out_visit_never_shows_protected_content() {
    let repo = seeded_repo();
    let mut harness =
        setup_view_harness(ViewKind::Dashboard, storage_with(&repo), false).await;

    harness.settle().await;
    let html = harness.render();
    assert!(!html.contains("Your Lessons"), "protected content in {html}");
    assert!(!html.contains("Fractions"), "protected content in {html}");
    assert!(html.contains("redirected:/login"), "no redirect in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn sign_out_during_dashboard_visit_redirects_to_login() {
    let repo = seeded_repo();
    let mut harness =
        setup_view_harness(ViewKind::Dashboard, storage_with(&repo), true).await;

    harness.settle().await;
    assert!(harness.render().contains("Your Lessons"));

    harness.provider.sign_out().await;
    harness.pump().await;
    let html = harness.render();
    assert!(html.contains("redirected:/login"), "no redirect in {html}");
    assert!(!html.contains("Your Lessons"), "protected content in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn entry_view_smoke_sends_signed_in_viewer_onward() {
    let repo = seeded_repo();
    let mut harness = setup_view_harness(ViewKind::Entry, storage_with(&repo), true).await;

    harness.settle().await;
    let html = harness.render();
    assert!(!html.contains("redirected:/login"), "wrong redirect in {html}");
    assert!(html.contains("redirected:/dashboard"), "no redirect in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn entry_view_smoke_sends_signed_out_viewer_to_login() {
    let repo = seeded_repo();
    let mut harness = setup_view_harness(ViewKind::Entry, storage_with(&repo), false).await;

    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("redirected:/login"), "no redirect in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn login_view_smoke_renders_form() {
    let repo = seeded_repo();
    let mut harness =
        setup_view_harness(ViewKind::Login, storage_with(&repo), false).await;

    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("Login to LMS"), "missing heading in {html}");
    assert!(html.contains("Log In"), "missing submit in {html}");
    assert!(html.contains("Toggle password visibility"), "missing toggle in {html}");
}

struct FailingLessons;

#[async_trait::async_trait]
impl LessonRepository for FailingLessons {
    async fn list_lessons(&self, _session: &Session) -> Result<Vec<Lesson>, StorageError> {
        Err(StorageError::Connection("fail".to_string()))
    }
}

#[tokio::test(flavor = "current_thread")]
async fn dashboard_view_smoke_renders_error_state() {
    let repo = seeded_repo();
    let mut storage = storage_with(&repo);
    storage.lessons = Arc::new(FailingLessons);
    let mut harness = setup_view_harness(ViewKind::Dashboard, storage, true).await;

    harness.settle().await;
    let html = harness.render();
    assert!(html.contains("connection error: fail"), "missing error in {html}");
    assert!(html.contains("Retry"), "missing retry in {html}");
    assert!(!html.contains("all caught up"), "error shown as empty in {html}");
}

/// Accepts reads but refuses every completion write.
struct ReadOnlyCompletions(InMemoryRepository);

#[async_trait::async_trait]
impl CompletionRepository for ReadOnlyCompletions {
    async fn completed_lesson_ids(&self, session: &Session) -> Result<Vec<LessonId>, StorageError> {
        self.0.completed_lesson_ids(session).await
    }

    async fn completed_lessons(
        &self,
        session: &Session,
    ) -> Result<Vec<CompletedLesson>, StorageError> {
        self.0.completed_lessons(session).await
    }

    async fn insert_completion(
        &self,
        _session: &Session,
        _completion: NewCompletion,
    ) -> Result<CompletionWrite, StorageError> {
        Err(StorageError::Http {
            status: 403,
            message: "new row violates row-level security policy".to_string(),
        })
    }
}

#[derive(Props, Clone, PartialEq)]
struct DialogHarnessProps {
    state: ConfirmState,
}

#[component]
fn DialogHarness(props: DialogHarnessProps) -> Element {
    let lesson = LessonCardVm {
        id: LessonId::new("l-1").unwrap(),
        title: "Fractions".to_string(),
        description: "All about Fractions".to_string(),
    };
    rsx! {
        ConfirmDialog {
            lesson,
            state: props.state.clone(),
            on_cancel: move |()| {},
            on_confirm: move |()| {},
        }
    }
}

fn render_dialog(state: ConfirmState) -> String {
    let mut dom = VirtualDom::new_with_props(DialogHarness, DialogHarnessProps { state });
    dom.rebuild_in_place();
    dioxus_ssr::render(&dom)
}

fn confirm_button_disabled(html: &str) -> bool {
    let start = html.find("modal-confirm").expect("confirm button");
    let tag = &html[start..];
    let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
    tag.contains("disabled") && !tag.contains("disabled=false") && !tag.contains("disabled=\"false\"")
}

#[tokio::test(flavor = "current_thread")]
async fn failed_completion_keeps_modal_open_with_reason_and_confirm_enabled() {
    let repo = seeded_repo();
    let mut storage = storage_with(&repo);
    storage.completions = Arc::new(ReadOnlyCompletions(repo.clone()));
    let lessons = lesson_service(&storage);
    let session = storage
        .auth
        .sign_in_with_password(EMAIL, PASSWORD)
        .await
        .expect("sign in");

    let err = record_completion(lessons, session.clone(), LessonId::new("l-1").unwrap())
        .await
        .expect_err("write refused");
    assert!(matches!(err, ViewError::Backend(_)), "{err:?}");

    let html = render_dialog(ConfirmState::Error(err));
    assert!(html.contains("Confirm Completion"), "modal closed in {html}");
    assert!(
        html.contains("new row violates row-level security policy"),
        "missing reason in {html}"
    );
    assert!(!confirm_button_disabled(&html), "confirm still disabled in {html}");
    assert!(repo.completed_lesson_ids(&session).await.unwrap().is_empty());
}

#[test]
fn confirm_is_disabled_while_saving() {
    let html = render_dialog(ConfirmState::Saving);
    assert!(confirm_button_disabled(&html), "confirm enabled in {html}");
    assert!(!html.contains("modal-error"), "stale error in {html}");
}
