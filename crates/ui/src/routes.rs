use dioxus::prelude::*;
use dioxus_router::{Link, Outlet, Routable, use_navigator};

use crate::context::AppContext;
use crate::hooks::use_session_state;
use crate::views::{CompletedView, DashboardView, EntryView, LoginView};

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[route("/", EntryView)] Entry {},
    #[route("/login", LoginView)] Login {},
    #[layout(Shell)]
        #[route("/dashboard", DashboardView)] Dashboard {},
        #[route("/dashboard/completed", CompletedView)] Completed {},
}

/// Header, slide-out sidebar and page content for signed-in pages.
#[component]
fn Shell() -> Element {
    let session = use_session_state();
    let mut sidebar_open = use_signal(|| false);
    let user = session.read().session().map(|session| session.user.clone());
    let display_name = user
        .as_ref()
        .map_or_else(|| "Student".to_string(), |user| user.display_name());

    rsx! {
        div { class: "shell",
            header { class: "shell-header",
                div { class: "shell-brand",
                    button {
                        class: "shell-menu",
                        r#type: "button",
                        aria_label: "Open menu",
                        onclick: move |_| sidebar_open.set(true),
                        "☰"
                    }
                    span { class: "shell-title", "LMS" }
                }
                if user.is_some() {
                    div { class: "shell-greeting", "Hello, {display_name}" }
                }
            }

            if sidebar_open() {
                div {
                    class: "shell-overlay",
                    onclick: move |_| sidebar_open.set(false),
                }
            }

            Sidebar {
                open: sidebar_open(),
                display_name: display_name.clone(),
                signed_in: user.is_some(),
                on_close: move |()| sidebar_open.set(false),
            }

            main { class: "shell-content",
                Outlet::<Route> {}
            }
        }
    }
}

#[component]
fn Sidebar(
    open: bool,
    display_name: String,
    signed_in: bool,
    on_close: EventHandler<()>,
) -> Element {
    let ctx = use_context::<AppContext>();
    let navigator = use_navigator();
    let class = if open { "sidebar sidebar--open" } else { "sidebar" };

    rsx! {
        aside { class: "{class}",
            div { class: "sidebar-header",
                span { class: "sidebar-name", "{display_name}" }
                button {
                    class: "sidebar-close",
                    r#type: "button",
                    onclick: move |_| on_close.call(()),
                    "✕"
                }
            }
            if signed_in {
                nav { class: "sidebar-nav",
                    Link {
                        class: "sidebar-link",
                        to: Route::Dashboard {},
                        onclick: move |_| on_close.call(()),
                        "Dashboard"
                    }
                    Link {
                        class: "sidebar-link",
                        to: Route::Completed {},
                        onclick: move |_| on_close.call(()),
                        "Completed Lessons"
                    }
                    button {
                        class: "sidebar-link sidebar-logout",
                        r#type: "button",
                        onclick: move |_| {
                            let provider = ctx.session();
                            on_close.call(());
                            spawn(async move {
                                provider.sign_out().await;
                                let _ = navigator.replace(Route::Login {});
                            });
                        },
                        "Logout"
                    }
                }
            }
        }
    }
}
