use std::sync::Arc;

use dioxus::prelude::*;
use lms_core::model::Session;
use services::{GuardPolicy, GuardState};

use crate::context::AppContext;
use crate::hooks::use_route_guard;
use crate::views::{Spinner, ViewError, ViewState, view_state_from_resource};
use crate::vm::{CompletedLessonVm, map_completed_lessons};

#[derive(Clone, Debug, PartialEq)]
struct CompletedData {
    items: Vec<CompletedLessonVm>,
}

#[component]
pub fn CompletedView() -> Element {
    match use_route_guard(GuardPolicy::RequireSession) {
        GuardState::Checking => rsx! { Spinner {} },
        GuardState::Unauthenticated => rsx! {
            p { class: "page redirecting", "Redirecting..." }
        },
        GuardState::Authenticated(session) => rsx! { CompletedPanel { session } },
    }
}

#[component]
fn CompletedPanel(session: Session) -> Element {
    let lessons = use_context::<AppContext>().lessons();

    let resource = use_resource(move || {
        let lessons = Arc::clone(&lessons);
        let session = session.clone();
        async move {
            let items = lessons.completed_lessons(&session).await?;
            Ok::<_, ViewError>(CompletedData {
                items: map_completed_lessons(&items),
            })
        }
    });
    let state = view_state_from_resource(&resource);

    rsx! {
        div { class: "page completed-page",
            h1 { class: "view-title", "✅ Completed Lessons" }

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
                    if data.items.is_empty() {
                        div { class: "empty-state", "You haven't completed any lessons yet." }
                    } else {
                        ul { class: "lesson-grid",
                            for item in data.items {
                                li { key: "{item.id}", class: "lesson-card",
                                    h2 { class: "lesson-title", "{item.title}" }
                                    p { class: "lesson-description", "{item.description}" }
                                    p { class: "lesson-completed-at",
                                        "📅 Completed on {item.completed_at_str}"
                                    }
                                }
                            }
                        }
                    }
                },
            }
        }
    }
}
