use lms_core::model::{Session, SessionState};

/// Which viewers a page admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPolicy {
    /// Protected pages: signed-out viewers go to the login screen.
    RequireSession,
    /// The login screen: signed-in viewers go to the dashboard.
    AnonymousOnly,
    /// The root page: everyone is sent somewhere once the check resolves.
    Entry,
}

/// Client-side navigation requested by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Login,
    Dashboard,
}

impl RedirectTarget {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            RedirectTarget::Login => "/login",
            RedirectTarget::Dashboard => "/dashboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Checking,
    Authenticated(Session),
    Unauthenticated,
}

impl GuardState {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            GuardState::Authenticated(session) => Some(session),
            GuardState::Checking | GuardState::Unauthenticated => None,
        }
    }
}

/// Per-page guard: `Checking -> {Authenticated, Unauthenticated}`.
///
/// Driven only by session notifications; it never polls. A guard issues at
/// most one redirect over its lifetime and never while checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    policy: GuardPolicy,
    state: GuardState,
    redirected: bool,
}

impl RouteGuard {
    #[must_use]
    pub fn new(policy: GuardPolicy) -> Self {
        Self {
            policy,
            state: GuardState::Checking,
            redirected: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &GuardState {
        &self.state
    }

    #[must_use]
    pub fn has_redirected(&self) -> bool {
        self.redirected
    }

    /// Feed the latest session state; returns a redirect to perform, if any.
    pub fn observe(&mut self, session: &SessionState) -> Option<RedirectTarget> {
        self.state = match session {
            SessionState::Checking => return None,
            SessionState::SignedIn(session) => GuardState::Authenticated(session.clone()),
            SessionState::SignedOut => GuardState::Unauthenticated,
        };

        if self.redirected {
            return None;
        }

        let target = match (self.policy, &self.state) {
            (GuardPolicy::RequireSession, GuardState::Unauthenticated)
            | (GuardPolicy::Entry, GuardState::Unauthenticated) => Some(RedirectTarget::Login),
            (GuardPolicy::AnonymousOnly, GuardState::Authenticated(_))
            | (GuardPolicy::Entry, GuardState::Authenticated(_)) => {
                Some(RedirectTarget::Dashboard)
            }
            _ => None,
        };
        self.redirected = target.is_some();
        target
    }
}
