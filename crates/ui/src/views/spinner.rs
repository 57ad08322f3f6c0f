use dioxus::prelude::*;

#[component]
pub fn Spinner(#[props(default = "Loading...".to_string())] label: String) -> Element {
    rsx! {
        div { class: "spinner-backdrop",
            div { class: "spinner", role: "status" }
            span { class: "spinner-label", "{label}" }
        }
    }
}
