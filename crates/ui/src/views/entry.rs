use dioxus::prelude::*;
use services::GuardPolicy;

use crate::hooks::use_route_guard;
use crate::views::Spinner;

/// Landing page: waits for the session check, then sends the viewer on.
#[component]
pub fn EntryView() -> Element {
    let _ = use_route_guard(GuardPolicy::Entry);

    rsx! {
        div { class: "page entry-page",
            Spinner {}
        }
    }
}
