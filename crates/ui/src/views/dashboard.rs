use std::sync::Arc;

use dioxus::prelude::*;
use lms_core::model::{LessonId, Session};
use services::{GuardPolicy, GuardState, LessonService};

use crate::context::AppContext;
use crate::hooks::use_route_guard;
use crate::views::{Spinner, ViewError, ViewState, view_state_from_resource};
use crate::vm::{LessonCardVm, map_lesson_cards};

#[derive(Clone, Debug, PartialEq)]
struct DashboardData {
    caught_up: bool,
    pending: Vec<LessonCardVm>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum ConfirmState {
    Idle,
    Saving,
    Error(ViewError),
}

#[component]
pub fn DashboardView() -> Element {
    match use_route_guard(GuardPolicy::RequireSession) {
        GuardState::Checking => rsx! { Spinner {} },
        GuardState::Unauthenticated => rsx! {
            p { class: "page redirecting", "Redirecting..." }
        },
        GuardState::Authenticated(session) => rsx! { DashboardPanel { session } },
    }
}

#[component]
fn DashboardPanel(session: Session) -> Element {
    let ctx = use_context::<AppContext>();
    let lessons = ctx.lessons();
    let session_for_resource = session.clone();

    let resource = use_resource(move || {
        let lessons = Arc::clone(&lessons);
        let session = session_for_resource.clone();
        async move {
            let progress = lessons.dashboard(&session).await?;
            Ok::<_, ViewError>(DashboardData {
                caught_up: progress.all_caught_up(),
                pending: map_lesson_cards(progress.pending()),
            })
        }
    });
    let state = view_state_from_resource(&resource);

    let mut selected = use_signal(|| None::<LessonCardVm>);
    let email = session.user.email.clone().unwrap_or_default();

    rsx! {
        div { class: "page dashboard-page",
            h1 { class: "view-title",
                "Welcome, "
                span { class: "view-title-accent", "{email}" }
            }
            h2 { class: "view-subtitle", "Your Lessons" }

            match state {
                ViewState::Idle | ViewState::Loading => rsx! { Spinner {} },
                ViewState::Error(err) => rsx! {
                    p { class: "view-error", "{err.message()}" }
                    button {
                        class: "btn btn-secondary",
                        r#type: "button",
                        onclick: move |_| {
                            let mut resource = resource;
                            resource.restart();
                        },
                        "Retry"
                    }
                },
                ViewState::Ready(data) => rsx! {
                    if data.caught_up {
                        div { class: "empty-state", "🎉 You're all caught up!" }
                    } else {
                        div { class: "lesson-grid",
                            for lesson in data.pending {
                                LessonCard {
                                    key: "{lesson.id}",
                                    lesson: lesson.clone(),
                                    on_complete: move |lesson| selected.set(Some(lesson)),
                                }
                            }
                        }
                    }
                },
            }

            if let Some(lesson) = selected() {
                ConfirmModal {
                    lesson,
                    session: session.clone(),
                    on_cancel: move |()| selected.set(None),
                    on_completed: move |()| {
                        selected.set(None);
                        let mut resource = resource;
                        resource.restart();
                    },
                }
            }
        }
    }
}

/// Record a completion, mapping a failure to what the modal shows.
pub(super) async fn record_completion(
    lessons: Arc<LessonService>,
    session: Session,
    lesson_id: LessonId,
) -> Result<(), ViewError> {
    lessons
        .confirm_completion(&session, &lesson_id)
        .await
        .map(|_| ())
        .map_err(ViewError::from)
}

/// Asks before recording a completion. Stays open with the reason if the
/// write fails.
#[component]
fn ConfirmModal(
    lesson: LessonCardVm,
    session: Session,
    on_cancel: EventHandler<()>,
    on_completed: EventHandler<()>,
) -> Element {
    let ctx = use_context::<AppContext>();
    let mut confirm_state = use_signal(|| ConfirmState::Idle);
    let lesson_id = lesson.id.clone();

    rsx! {
        ConfirmDialog {
            lesson,
            state: confirm_state(),
            on_cancel,
            on_confirm: move |()| {
                if confirm_state() == ConfirmState::Saving {
                    return;
                }
                let lessons = ctx.lessons();
                let session = session.clone();
                let lesson_id = lesson_id.clone();
                confirm_state.set(ConfirmState::Saving);
                spawn(async move {
                    match record_completion(lessons, session, lesson_id).await {
                        Ok(()) => {
                            confirm_state.set(ConfirmState::Idle);
                            on_completed.call(());
                        }
                        Err(err) => confirm_state.set(ConfirmState::Error(err)),
                    }
                });
            },
        }
    }
}

#[component]
pub(super) fn ConfirmDialog(
    lesson: LessonCardVm,
    state: ConfirmState,
    on_cancel: EventHandler<()>,
    on_confirm: EventHandler<()>,
) -> Element {
    let saving = state == ConfirmState::Saving;

    rsx! {
        div { class: "modal-overlay",
            div {
                class: "modal",
                onclick: move |evt| evt.stop_propagation(),
                h3 { class: "modal-title", "Confirm Completion" }
                p { class: "modal-body",
                    "Are you sure you want to mark "
                    strong { "{lesson.title}" }
                    " as completed?"
                }
                if let ConfirmState::Error(err) = &state {
                    p { class: "modal-error", "{err.message()}" }
                }
                div { class: "modal-actions",
                    button {
                        class: "btn modal-cancel",
                        r#type: "button",
                        onclick: move |_| on_cancel.call(()),
                        "Cancel"
                    }
                    button {
                        class: "btn btn-primary modal-confirm",
                        r#type: "button",
                        disabled: saving,
                        onclick: move |_| on_confirm.call(()),
                        if saving {
                            span { class: "btn-spinner" }
                        }
                        "Confirm"
                    }
                }
            }
        }
    }
}

#[component]
fn LessonCard(lesson: LessonCardVm, on_complete: EventHandler<LessonCardVm>) -> Element {
    let target = lesson.clone();
    rsx! {
        div { class: "lesson-card",
            div {
                h3 { class: "lesson-title", "{lesson.title}" }
                p { class: "lesson-description", "{lesson.description}" }
            }
            button {
                class: "btn btn-primary lesson-complete",
                r#type: "button",
                onclick: move |_| on_complete.call(target.clone()),
                "✅ Mark as Complete"
            }
        }
    }
}
