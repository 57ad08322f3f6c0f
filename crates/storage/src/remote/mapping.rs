use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use lms_core::model::{
    AccessToken, CompletedLesson, CompletionRecord, Lesson, LessonId, Session, SessionUser,
    StudentId,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::repository::{AuthError, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Accept `timestamptz` and plain `timestamp` columns; the latter are UTC.
fn utc_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_utc_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn parse_utc_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("unrecognised timestamp: {raw}"))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LessonRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl LessonRow {
    pub(crate) fn into_lesson(self) -> Result<Lesson, StorageError> {
        Ok(Lesson::new(
            LessonId::new(self.id).map_err(ser)?,
            self.title,
            self.description.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionIdRow {
    pub lesson_id: String,
}

/// Row of `completed_at,lesson:lessons(id,title,description)`.
///
/// `lesson` is null when row-level policies hide the lesson.
#[derive(Debug, Deserialize)]
pub(crate) struct CompletedLessonRow {
    #[serde(deserialize_with = "utc_timestamp")]
    pub completed_at: DateTime<Utc>,
    pub lesson: Option<LessonRow>,
}

impl CompletedLessonRow {
    pub(crate) fn into_completed(self) -> Result<Option<CompletedLesson>, StorageError> {
        let Some(lesson) = self.lesson else {
            return Ok(None);
        };
        Ok(Some(CompletedLesson::new(
            lesson.into_lesson()?,
            self.completed_at,
        )))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CompletionRow {
    pub student_id: String,
    pub lesson_id: String,
    #[serde(deserialize_with = "utc_timestamp")]
    pub completed_at: DateTime<Utc>,
}

impl CompletionRow {
    pub(crate) fn from_record(record: &CompletionRecord) -> Self {
        Self {
            student_id: record.student_id.as_str().to_owned(),
            lesson_id: record.lesson_id.as_str().to_owned(),
            completed_at: record.completed_at,
        }
    }

    pub(crate) fn into_record(self) -> Result<CompletionRecord, StorageError> {
        Ok(CompletionRecord::new(
            StudentId::new(self.student_id).map_err(ser)?,
            LessonId::new(self.lesson_id).map_err(ser)?,
            self.completed_at,
        ))
    }
}

pub(crate) fn lesson_ids(rows: Vec<CompletionIdRow>) -> Result<Vec<LessonId>, StorageError> {
    rows.into_iter()
        .map(|row| LessonId::new(row.lesson_id).map_err(ser))
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserResponse {
    pub(crate) fn into_user(self) -> Result<SessionUser, AuthError> {
        let id = StudentId::new(self.id).map_err(|e| AuthError::Malformed(e.to_string()))?;
        Ok(SessionUser::new(id, self.email.filter(|e| !e.is_empty())))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: UserResponse,
}

impl TokenResponse {
    /// `expires_at` (unix seconds) wins over `expires_in` relative to `now`.
    pub(crate) fn into_session(self, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let user = self.user.into_user()?;
        let mut session = Session::new(user, AccessToken::new(self.access_token));
        if let Some(token) = self.refresh_token.filter(|t| !t.is_empty()) {
            session = session.with_refresh_token(token);
        }
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => DateTime::<Utc>::from_timestamp(at, 0),
            (None, Some(secs)) => Some(now + Duration::seconds(secs)),
            (None, None) => None,
        };
        if let Some(at) = expires_at {
            session = session.with_expiry(at);
        }
        Ok(session)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}
