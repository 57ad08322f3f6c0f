//! Session-aware hooks shared by the pages.

use std::sync::Arc;

use dioxus::prelude::*;
use dioxus_router::use_navigator;
use lms_core::model::SessionState;
use services::{GuardPolicy, GuardState, RouteGuard};

use crate::context::AppContext;

/// Live view of the session, updated from the provider's notifications.
///
/// Kicks off the initial session lookup; the provider runs it once no matter
/// how many components ask. The subscription is dropped with the component.
pub fn use_session_state() -> Signal<SessionState> {
    let provider = use_context::<AppContext>().session();
    let mut state = use_signal(|| provider.current());

    use_future(move || {
        let provider = Arc::clone(&provider);
        async move {
            let mut subscription = provider.subscribe();
            provider.initialize().await;
            let mut latest = Some(provider.current());
            while let Some(next) = latest {
                if *state.peek() != next {
                    state.set(next);
                }
                latest = subscription.next_change().await;
            }
        }
    });

    state
}

/// Guard the current page; performs at most one client-side redirect.
pub fn use_route_guard(policy: GuardPolicy) -> GuardState {
    let session = use_session_state();
    let mut guard = use_signal(|| RouteGuard::new(policy));
    let navigator = use_navigator();

    use_effect(move || {
        let current = session.read().clone();
        let redirect = guard.write().observe(&current);
        if let Some(target) = redirect {
            log::debug!("guard redirecting to {}", target.path());
            let _ = navigator.replace(target.path());
        }
    });

    guard.read().state().clone()
}
