use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, Response, StatusCode};

use lms_core::model::{Session, SessionUser};

use super::RemoteBackend;
use super::backend_message;
use super::mapping::{PasswordGrant, RefreshGrant, TokenResponse, UserResponse};
use crate::repository::{AuthError, AuthGateway};

fn auth_connection(e: reqwest::Error) -> AuthError {
    AuthError::Connection(e.to_string())
}

fn auth_url(backend: &RemoteBackend, path: &str) -> Result<reqwest::Url, AuthError> {
    backend
        .config
        .endpoint(path)
        .map_err(|e| AuthError::Malformed(e.to_string()))
}

type ErrorMapper = fn(StatusCode, &str) -> AuthError;

async fn auth_error(response: Response, map: ErrorMapper) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    map(status, &body)
}

/// Map a failed auth response; the service's own message is kept verbatim.
pub(crate) fn auth_error_from(status: StatusCode, body: &str) -> AuthError {
    let message = backend_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuthError::Unauthorized,
        s if s.is_client_error() => AuthError::Rejected { message },
        _ => AuthError::Connection(format!("{status}: {message}")),
    }
}

/// A refused password grant is always shown to the viewer as sent.
pub(crate) fn password_grant_error_from(status: StatusCode, body: &str) -> AuthError {
    if status.is_client_error() {
        AuthError::Rejected {
            message: backend_message(body),
        }
    } else {
        auth_error_from(status, body)
    }
}

impl RemoteBackend {
    async fn token_grant<T: serde::Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &T,
        map: ErrorMapper,
    ) -> Result<Session, AuthError> {
        let mut url = auth_url(self, "auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .request(Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(auth_connection)?;
        if !response.status().is_success() {
            return Err(auth_error(response, map).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        token.into_session(Utc::now())
    }
}

#[async_trait]
impl AuthGateway for RemoteBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.token_grant(
            "password",
            &PasswordGrant { email, password },
            password_grant_error_from,
        )
        .await
    }

    async fn get_user(&self, session: &Session) -> Result<SessionUser, AuthError> {
        let url = auth_url(self, "auth/v1/user")?;
        let response = self
            .request(Method::GET, url)
            .bearer_auth(session.access_token.expose())
            .send()
            .await
            .map_err(auth_connection)?;
        if !response.status().is_success() {
            return Err(auth_error(response, auth_error_from).await);
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        user.into_user()
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(AuthError::Unauthorized)?;
        match self
            .token_grant(
                "refresh_token",
                &RefreshGrant { refresh_token },
                auth_error_from,
            )
            .await
        {
            // An unknown or reused refresh token comes back as a 400.
            Err(AuthError::Rejected { message }) => {
                log::info!("refresh token refused: {message}");
                Err(AuthError::Unauthorized)
            }
            other => other,
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let url = auth_url(self, "auth/v1/logout")?;
        let response = self
            .request(Method::POST, url)
            .bearer_auth(session.access_token.expose())
            .send()
            .await
            .map_err(auth_connection)?;
        match response.status() {
            s if s.is_success() => Ok(()),
            // Already revoked on the service side.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(auth_error(response, auth_error_from).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_rejections_with_the_service_message() {
        let err = auth_error_from(
            StatusCode::BAD_REQUEST,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert_eq!(
            err,
            AuthError::Rejected {
                message: "Invalid login credentials".into()
            }
        );
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn unauthorized_session_is_not_a_rejection() {
        assert_eq!(
            auth_error_from(StatusCode::UNAUTHORIZED, r#"{"msg":"invalid JWT"}"#),
            AuthError::Unauthorized
        );
        assert_eq!(
            auth_error_from(StatusCode::FORBIDDEN, ""),
            AuthError::Unauthorized
        );
    }

    #[test]
    fn server_errors_are_connection_failures() {
        assert!(matches!(
            auth_error_from(StatusCode::SERVICE_UNAVAILABLE, "upstream down"),
            AuthError::Connection(message) if message.contains("upstream down")
        ));
    }

    #[test]
    fn refused_password_grant_keeps_the_service_message() {
        assert_eq!(
            password_grant_error_from(StatusCode::UNAUTHORIZED, r#"{"msg":"Email not confirmed"}"#),
            AuthError::Rejected {
                message: "Email not confirmed".into()
            }
        );
        assert_eq!(
            password_grant_error_from(StatusCode::BAD_REQUEST, r#"{"msg":"Invalid login credentials"}"#),
            AuthError::Rejected {
                message: "Invalid login credentials".into()
            }
        );
        assert!(matches!(
            password_grant_error_from(StatusCode::BAD_GATEWAY, ""),
            AuthError::Connection(_)
        ));
    }
}
