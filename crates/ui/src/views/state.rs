use dioxus::prelude::*;
use services::LessonServiceError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewError {
    Unknown,
    /// A completion for the same lesson is still being saved.
    Busy,
    /// The backend refused or could not be reached; carries its reason.
    Backend(String),
}

impl ViewError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ViewError::Unknown => "Something went wrong. Please try again.",
            ViewError::Busy => "Still saving, please wait.",
            ViewError::Backend(reason) => reason,
        }
    }
}

impl From<LessonServiceError> for ViewError {
    fn from(err: LessonServiceError) -> Self {
        match err {
            LessonServiceError::CompletionInFlight => ViewError::Busy,
            LessonServiceError::Storage(err) => ViewError::Backend(err.to_string()),
            _ => ViewError::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewState<T> {
    Idle,
    Loading,
    Ready(T),
    Error(ViewError),
}

#[must_use]
pub fn view_state_from_resource<T: Clone>(
    resource: &Resource<Result<T, ViewError>>,
) -> ViewState<T> {
    match resource.state().cloned() {
        UseResourceState::Pending => ViewState::Loading,
        UseResourceState::Ready => match resource.value().read().as_ref() {
            Some(Ok(data)) => ViewState::Ready(data.clone()),
            Some(Err(err)) => ViewState::Error(err.clone()),
            None => ViewState::Error(ViewError::Unknown),
        },
        UseResourceState::Paused | UseResourceState::Stopped => ViewState::Idle,
    }
}
