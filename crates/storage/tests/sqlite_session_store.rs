use chrono::Duration;
use lms_core::model::{AccessToken, Session, SessionUser, StudentId};
use lms_core::time::fixed_now;
use storage::repository::SessionStore;
use storage::sqlite::SqliteSessionStore;

fn build_session(token: &str) -> Session {
    let user = SessionUser::new(
        StudentId::new("5f1c-student").unwrap(),
        Some("asha@school.test".into()),
    );
    Session::new(user, AccessToken::new(token))
        .with_refresh_token("refresh-1")
        .with_expiry(fixed_now() + Duration::hours(1))
}

#[tokio::test]
async fn sqlite_store_round_trips_session() {
    let store = SqliteSessionStore::open("sqlite:file:memdb_session_roundtrip?mode=memory&cache=shared")
        .await
        .expect("open");

    assert!(store.load().await.unwrap().is_none());

    let session = build_session("access-1");
    store.save(&session).await.unwrap();

    let loaded = store.load().await.unwrap().expect("stored session");
    assert_eq!(loaded, session);
}

#[tokio::test]
async fn sqlite_store_keeps_a_single_slot() {
    let store = SqliteSessionStore::open("sqlite:file:memdb_session_slot?mode=memory&cache=shared")
        .await
        .expect("open");

    store.save(&build_session("access-1")).await.unwrap();
    store.save(&build_session("access-2")).await.unwrap();

    let loaded = store.load().await.unwrap().expect("stored session");
    assert_eq!(loaded.access_token.expose(), "access-2");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_sessions")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn sqlite_store_clear_removes_session() {
    let store = SqliteSessionStore::open("sqlite:file:memdb_session_clear?mode=memory&cache=shared")
        .await
        .expect("open");

    store.save(&build_session("access-1")).await.unwrap();
    store.clear().await.unwrap();
    assert!(store.load().await.unwrap().is_none());

    // Migrations are idempotent.
    store.migrate().await.expect("re-migrate");
}
