use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

mod migrate;
mod session_repo;

/// Local `SQLite` database holding the persisted auth session.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteSessionStore {
    /// Connect to `SQLite` using the given URL.
    ///
    /// A private `sqlite::memory:` database lives on one pinned connection.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let in_memory = database_url == "sqlite::memory:";
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 2 })
            .min_connections(u32::from(in_memory))
            .max_lifetime(if in_memory {
                None
            } else {
                Some(Duration::from_secs(30 * 60))
            })
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteSessionStore>();
    }
}
