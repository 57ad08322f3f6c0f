use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::StudentId;

/// Bearer token issued by the auth service.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Identity attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: StudentId,
    pub email: Option<String>,
}

impl SessionUser {
    #[must_use]
    pub fn new(id: StudentId, email: Option<String>) -> Self {
        Self { id, email }
    }

    /// Friendly name derived from the email's local part.
    ///
    /// `jane.doe@school.test` becomes `Jane.doe`; users without an email are
    /// shown as `Student`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let local = self
            .email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|part| !part.is_empty());

        let Some(local) = local else {
            return "Student".to_owned();
        };

        let mut chars = local.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Student".to_owned(),
        }
    }
}

/// The client's evidence of an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    pub access_token: AccessToken,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub fn new(user: SessionUser, access_token: AccessToken) -> Self {
        Self {
            user,
            access_token,
            refresh_token: None,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.user.id
    }

    /// A session without an expiry never expires from the client's view.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// What the client currently knows about the viewer's identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The initial lookup has not resolved yet. Not the same as signed out.
    #[default]
    Checking,
    SignedIn(Session),
    SignedOut,
}

impl SessionState {
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedIn(session) => Some(session),
            SessionState::Checking | SessionState::SignedOut => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Checking)
    }
}

/// Kind of change reported by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthEvent::InitialSession => "initial_session",
            AuthEvent::SignedIn => "signed_in",
            AuthEvent::SignedOut => "signed_out",
            AuthEvent::TokenRefreshed => "token_refreshed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn user(email: Option<&str>) -> SessionUser {
        SessionUser::new(StudentId::new("u-1").unwrap(), email.map(str::to_owned))
    }

    #[test]
    fn display_name_capitalises_local_part() {
        assert_eq!(user(Some("asha@school.test")).display_name(), "Asha");
        assert_eq!(user(Some("jane.doe@x.io")).display_name(), "Jane.doe");
    }

    #[test]
    fn display_name_falls_back_to_student() {
        assert_eq!(user(None).display_name(), "Student");
        assert_eq!(user(Some("@nobody")).display_name(), "Student");
    }

    #[test]
    fn access_token_is_redacted_in_debug() {
        let session = Session::new(user(None), AccessToken::new("secret-token"));
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = fixed_now();
        let session = Session::new(user(None), AccessToken::new("t")).with_expiry(now);
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));

        let open = Session::new(user(None), AccessToken::new("t"));
        assert!(!open.is_expired(now));
    }

    #[test]
    fn checking_is_not_resolved() {
        assert!(!SessionState::Checking.is_resolved());
        assert!(SessionState::SignedOut.is_resolved());
        assert!(SessionState::SignedOut.session().is_none());
    }
}
