#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod lesson_service;
pub mod route_guard;
pub mod session_provider;

pub use lms_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, LessonServiceError, SessionError};
pub use lesson_service::{CompletionOutcome, LessonService};
pub use route_guard::{GuardPolicy, GuardState, RedirectTarget, RouteGuard};
pub use session_provider::{SessionProvider, SessionSubscription};
