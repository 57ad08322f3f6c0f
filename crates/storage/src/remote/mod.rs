//! Adapters for the hosted backend: GoTrue-style auth and PostgREST tables.

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use thiserror::Error;

use lms_core::model::Session;

use crate::repository::{
    AuthGateway, CompletionRepository, LessonRepository, SessionStore, Storage, StorageError,
};

mod auth;
mod mapping;
mod tables;

/// Errors raised while validating backend configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BackendConfigError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
    #[error("backend url must use http or https, got {0}")]
    UnsupportedScheme(String),
    #[error("backend api key is empty")]
    MissingKey,
}

/// Endpoint and public key of the hosted backend.
#[derive(Clone)]
pub struct BackendConfig {
    base_url: Url,
    anon_key: String,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl BackendConfig {
    /// Validate and build a backend configuration.
    ///
    /// # Errors
    ///
    /// Returns `BackendConfigError` if the URL does not parse, is not http(s),
    /// or the key is blank.
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self, BackendConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(&format!("{trimmed}/"))
            .map_err(|e| BackendConfigError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(BackendConfigError::UnsupportedScheme(
                base_url.scheme().to_owned(),
            ));
        }
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(BackendConfigError::MissingKey);
        }
        Ok(Self { base_url, anon_key })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, StorageError> {
        self.base_url
            .join(path)
            .map_err(|e| StorageError::Serialization(format!("bad endpoint {path}: {e}")))
    }
}

/// HTTP client for the hosted backend.
///
/// One instance serves as auth gateway and as both table repositories.
#[derive(Clone)]
pub struct RemoteBackend {
    client: Client,
    config: Arc<BackendConfig>,
}

impl RemoteBackend {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Storage whose tables and auth go to this backend.
    #[must_use]
    pub fn into_storage(self, sessions: Arc<dyn SessionStore>) -> Storage {
        let lessons: Arc<dyn LessonRepository> = Arc::new(self.clone());
        let completions: Arc<dyn CompletionRepository> = Arc::new(self.clone());
        let auth: Arc<dyn AuthGateway> = Arc::new(self);
        Storage {
            lessons,
            completions,
            auth,
            sessions,
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        log::debug!("{method} {}", url.path());
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
    }

    /// Table requests run as the signed-in user so row-level policies apply.
    fn authed(&self, method: Method, url: Url, session: &Session) -> RequestBuilder {
        self.request(method, url)
            .bearer_auth(session.access_token.expose())
    }
}

/// Pull a human-readable message out of an error body.
///
/// Auth endpoints answer with `msg` or `error_description`, table endpoints
/// with `message`; anything else falls back to the raw body.
pub(crate) fn backend_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|value| {
        ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
            .map(str::to_owned)
    });
    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => "no response body".to_owned(),
        None => body.trim().to_owned(),
    }
}

async fn storage_error(response: Response) -> StorageError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    storage_error_from(status, &body)
}

pub(crate) fn storage_error_from(status: StatusCode, body: &str) -> StorageError {
    let message = backend_message(body);
    log::warn!("backend request failed with {status}: {message}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Unauthorized,
        StatusCode::NOT_FOUND => StorageError::NotFound,
        StatusCode::CONFLICT => StorageError::Conflict,
        _ => StorageError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

fn connection(e: reqwest::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}
