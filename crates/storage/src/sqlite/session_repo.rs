use chrono::{DateTime, Utc};
use lms_core::model::{AccessToken, Session, SessionUser, StudentId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteSessionStore;
use crate::repository::{SessionStore, StorageError};

const SLOT: &str = "current";

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait::async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, email, access_token, refresh_token, expires_at
            FROM auth_sessions WHERE slot = ?1
            ",
        )
        .bind(SLOT)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO auth_sessions (slot, user_id, email, access_token, refresh_token, expires_at, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(slot) DO UPDATE SET
                user_id = excluded.user_id,
                email = excluded.email,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                saved_at = excluded.saved_at
            ",
        )
        .bind(SLOT)
        .bind(session.user.id.as_str())
        .bind(session.user.email.as_deref())
        .bind(session.access_token.expose())
        .bind(session.refresh_token.as_deref())
        .bind(session.expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM auth_sessions WHERE slot = ?1")
            .bind(SLOT)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}

fn session_from_row(row: &SqliteRow) -> Result<Session, StorageError> {
    let user = SessionUser::new(
        StudentId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?,
        row.try_get::<Option<String>, _>("email").map_err(ser)?,
    );
    let mut session = Session::new(
        user,
        AccessToken::new(row.try_get::<String, _>("access_token").map_err(ser)?),
    );
    if let Some(token) = row.try_get::<Option<String>, _>("refresh_token").map_err(ser)? {
        session = session.with_refresh_token(token);
    }
    if let Some(at) = row
        .try_get::<Option<DateTime<Utc>>, _>("expires_at")
        .map_err(ser)?
    {
        session = session.with_expiry(at);
    }
    Ok(session)
}
