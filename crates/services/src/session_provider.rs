//! Current-session ownership and auth-change notifications.

use std::sync::Arc;

use lms_core::Clock;
use lms_core::model::{AuthEvent, Session, SessionState};
use storage::repository::{AuthError, AuthGateway, SessionStore};
use tokio::sync::{Mutex, OnceCell, watch};

use crate::error::SessionError;

/// Owns the viewer's session and notifies observers when it changes.
///
/// The state starts as `Checking` and is resolved by [`SessionProvider::initialize`].
pub struct SessionProvider {
    clock: Clock,
    auth: Arc<dyn AuthGateway>,
    store: Arc<dyn SessionStore>,
    state: watch::Sender<SessionState>,
    initialized: OnceCell<()>,
    // Held across a state change and its store write so both agree.
    transition: Mutex<()>,
}

/// Store write the initial lookup wants, applied only if its result is.
enum StoreWrite {
    Save(Session),
    Clear,
    Keep,
}

/// Observer registration returned by [`SessionProvider::subscribe`].
///
/// Dropping the handle deregisters the observer.
pub struct SessionSubscription {
    rx: watch::Receiver<SessionState>,
}

impl SessionSubscription {
    /// State at the time of the last observed change.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the provider is gone.
    pub async fn next_change(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Explicitly deregister.
    pub fn unsubscribe(self) {}
}

impl SessionProvider {
    #[must_use]
    pub fn new(clock: Clock, auth: Arc<dyn AuthGateway>, store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Checking);
        Self {
            clock,
            auth,
            store,
            state,
            initialized: OnceCell::new(),
            transition: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.state.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Resolve the initial session exactly once, however many callers ask.
    ///
    /// Failures are logged and resolve to `SignedOut`. A sign-in that lands
    /// while the lookup is pending wins over the lookup's result.
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                let (resolved, write) = self.lookup().await;
                let _transition = self.transition.lock().await;
                let applied = self.state.send_if_modified(|state| {
                    if state.is_resolved() {
                        return false;
                    }
                    *state = resolved;
                    true
                });
                if applied {
                    match write {
                        StoreWrite::Save(session) => self.persist(&session).await,
                        StoreWrite::Clear => self.forget().await,
                        StoreWrite::Keep => {}
                    }
                    log::info!(
                        "auth event {}: signed_in={}",
                        AuthEvent::InitialSession,
                        self.state.borrow().session().is_some()
                    );
                } else {
                    log::debug!("initial lookup superseded by a newer auth event");
                }
            })
            .await;
    }

    async fn lookup(&self) -> (SessionState, StoreWrite) {
        let stored = match self.store.load().await {
            Ok(Some(session)) => session,
            Ok(None) => return (SessionState::SignedOut, StoreWrite::Keep),
            Err(err) => {
                log::warn!("could not read stored session: {err}");
                return (SessionState::SignedOut, StoreWrite::Keep);
            }
        };

        let checked = if stored.is_expired(self.clock.now()) {
            self.auth.refresh(&stored).await
        } else {
            self.auth
                .get_user(&stored)
                .await
                .map(|user| Session { user, ..stored })
        };

        match checked {
            Ok(session) => (
                SessionState::SignedIn(session.clone()),
                StoreWrite::Save(session),
            ),
            Err(AuthError::Unauthorized) => {
                log::info!("stored session is no longer valid");
                (SessionState::SignedOut, StoreWrite::Clear)
            }
            Err(err) => {
                log::warn!("session lookup failed: {err}");
                (SessionState::SignedOut, StoreWrite::Keep)
            }
        }
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Auth`; a rejected sign-in carries the auth
    /// service's message unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let session = self
            .auth
            .sign_in_with_password(email, password)
            .await
            .inspect_err(|err| log::warn!("sign-in failed: {err}"))?;
        let _transition = self.transition.lock().await;
        self.persist(&session).await;
        self.publish(AuthEvent::SignedIn, SessionState::SignedIn(session.clone()));
        Ok(session)
    }

    /// End the session locally and on the service.
    ///
    /// Observers always see `SignedOut`, even if the remote revoke fails.
    pub async fn sign_out(&self) {
        if let Some(session) = self.current_session() {
            if let Err(err) = self.auth.sign_out(&session).await {
                log::warn!("remote sign-out failed: {err}");
            }
        }
        let _transition = self.transition.lock().await;
        self.forget().await;
        self.publish(AuthEvent::SignedOut, SessionState::SignedOut);
    }

    /// Trade the refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a session, or
    /// `SessionError::Auth` if the service refuses; a refused refresh signs
    /// the viewer out.
    pub async fn refresh(&self) -> Result<Session, SessionError> {
        let current = self.current_session().ok_or(SessionError::NotSignedIn)?;
        match self.auth.refresh(&current).await {
            Ok(session) => {
                let _transition = self.transition.lock().await;
                self.persist(&session).await;
                self.publish(
                    AuthEvent::TokenRefreshed,
                    SessionState::SignedIn(session.clone()),
                );
                Ok(session)
            }
            Err(err) => {
                log::warn!("token refresh failed: {err}");
                if err == AuthError::Unauthorized {
                    let _transition = self.transition.lock().await;
                    self.forget().await;
                    self.publish(AuthEvent::SignedOut, SessionState::SignedOut);
                }
                Err(err.into())
            }
        }
    }

    fn publish(&self, event: AuthEvent, state: SessionState) {
        log::info!("auth event {event}");
        self.state.send_replace(state);
    }

    async fn persist(&self, session: &Session) {
        if let Err(err) = self.store.save(session).await {
            log::warn!("could not persist session: {err}");
        }
    }

    async fn forget(&self) {
        if let Err(err) = self.store.clear().await {
            log::warn!("could not clear stored session: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::StudentId;
    use storage::memory::{InMemoryAuth, InMemorySessionStore};

    fn provider() -> (SessionProvider, Arc<InMemorySessionStore>) {
        let auth = InMemoryAuth::new().with_account(
            "asha@school.test",
            "pw",
            StudentId::new("asha").unwrap(),
        );
        let store = Arc::new(InMemorySessionStore::new());
        let provider = SessionProvider::new(
            Clock::default(),
            Arc::new(auth),
            Arc::clone(&store) as Arc<dyn SessionStore>,
        );
        (provider, store)
    }

    #[tokio::test]
    async fn starts_checking_and_resolves_signed_out() {
        let (provider, _) = provider();
        assert_eq!(provider.current(), SessionState::Checking);

        provider.initialize().await;
        assert_eq!(provider.current(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn sign_in_before_lookup_is_not_overwritten() {
        let (provider, _) = provider();
        provider.sign_in("asha@school.test", "pw").await.unwrap();

        provider.initialize().await;
        assert!(provider.current_session().is_some());
    }

    #[tokio::test]
    async fn dropping_subscription_deregisters() {
        let (provider, _) = provider();
        let first = provider.subscribe();
        let second = provider.subscribe();
        assert_eq!(provider.subscriber_count(), 2);

        drop(first);
        second.unsubscribe();
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn refresh_without_session_is_an_error() {
        let (provider, _) = provider();
        provider.initialize().await;
        assert!(matches!(
            provider.refresh().await,
            Err(SessionError::NotSignedIn)
        ));
    }
}
