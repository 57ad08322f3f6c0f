use dioxus::prelude::*;
use services::GuardPolicy;

use crate::context::AppContext;
use crate::hooks::use_route_guard;

#[derive(Clone, Debug, PartialEq, Eq)]
enum LoginState {
    Idle,
    Submitting,
    Failed(String),
}

/// Email and password sign-in. A successful sign-in is picked up by the
/// page guard, which moves the viewer to the dashboard.
#[component]
pub fn LoginView() -> Element {
    let ctx = use_context::<AppContext>();
    let _ = use_route_guard(GuardPolicy::AnonymousOnly);

    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut show_password = use_signal(|| false);
    let mut login_state = use_signal(|| LoginState::Idle);

    let submitting = login_state() == LoginState::Submitting;
    let password_type = if show_password() { "text" } else { "password" };

    rsx! {
        div { class: "page login-page",
            div { class: "login-card",
                div { class: "login-branding",
                    h1 { class: "login-title", "Login to LMS" }
                    p { class: "login-subtitle", "Enter your credentials below" }
                }

                form {
                    class: "login-form",
                    onsubmit: move |evt: FormEvent| {
                        evt.prevent_default();
                        if login_state() == LoginState::Submitting {
                            return;
                        }
                        let provider = ctx.session();
                        let email = email();
                        let password = password();
                        login_state.set(LoginState::Submitting);
                        spawn(async move {
                            if let Err(err) = provider.sign_in(&email, &password).await {
                                login_state.set(LoginState::Failed(err.to_string()));
                            }
                        });
                    },

                    div { class: "login-field",
                        input {
                            r#type: "email",
                            placeholder: "Email",
                            value: "{email}",
                            required: true,
                            disabled: submitting,
                            oninput: move |evt| email.set(evt.value()),
                        }
                    }

                    div { class: "login-field",
                        input {
                            r#type: "{password_type}",
                            placeholder: "Password",
                            value: "{password}",
                            required: true,
                            disabled: submitting,
                            oninput: move |evt| password.set(evt.value()),
                        }
                        button {
                            class: "login-toggle",
                            r#type: "button",
                            aria_label: "Toggle password visibility",
                            disabled: submitting,
                            onclick: move |_| show_password.set(!show_password()),
                            if show_password() { "Hide" } else { "Show" }
                        }
                    }

                    if let LoginState::Failed(message) = login_state() {
                        p { class: "login-error", "{message}" }
                    }

                    button {
                        class: "btn btn-primary login-submit",
                        r#type: "submit",
                        disabled: submitting,
                        if submitting { "Logging in..." } else { "Log In" }
                    }
                }
            }
        }
    }
}
