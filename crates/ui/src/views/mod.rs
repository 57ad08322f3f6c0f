mod completed;
mod dashboard;
mod entry;
mod login;
mod spinner;
mod state;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;

pub use completed::CompletedView;
pub use dashboard::DashboardView;
pub use entry::EntryView;
pub use login::LoginView;
pub use spinner::Spinner;
pub use state::{ViewError, ViewState, view_state_from_resource};
