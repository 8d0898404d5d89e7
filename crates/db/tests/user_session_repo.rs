//! Integration tests for the user and session repositories.

use chrono::{Duration, Utc};
use rpa_core::roles::{ROLE_AUDITOR_ID, ROLE_USER_ID};
use rpa_db::models::session::CreateSession;
use rpa_db::models::user::{CreateUser, UpdateUser};
use rpa_db::repositories::{SessionRepo, UserRepo};
use sqlx::PgPool;

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        name: Some("Test User".to_string()),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        role_id: ROLE_USER_ID,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_and_find_user(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("ana@example.com"))
        .await
        .unwrap();
    assert!(user.is_active);
    assert_eq!(user.failed_login_count, 0);

    let found = UserRepo::find_by_email(&pool, "ana@example.com")
        .await
        .unwrap()
        .expect("user should exist");
    assert_eq!(found.id, user.id);
    assert!(UserRepo::find_by_id(&pool, user.id + 1000).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_email_violates_constraint(pool: PgPool) {
    UserRepo::create(&pool, &new_user("dup@example.com"))
        .await
        .unwrap();
    let err = UserRepo::create(&pool, &new_user("dup@example.com"))
        .await
        .unwrap_err();
    match err {
        sqlx::Error::Database(db) => {
            assert_eq!(db.code().as_deref(), Some("23505"));
            assert_eq!(db.constraint(), Some("uq_users_email"));
        }
        other => panic!("expected database error, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_and_deactivate(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("bo@example.com"))
        .await
        .unwrap();

    let updated = UserRepo::update(
        &pool,
        user.id,
        &UpdateUser {
            role_id: Some(ROLE_AUDITOR_ID),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .expect("row exists");
    assert_eq!(updated.role_id, ROLE_AUDITOR_ID);
    assert_eq!(updated.email, "bo@example.com");

    assert!(UserRepo::deactivate(&pool, user.id).await.unwrap());
    assert!(!UserRepo::deactivate(&pool, user.id).await.unwrap());
    assert_eq!(UserRepo::count(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_bookkeeping(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("cy@example.com"))
        .await
        .unwrap();

    let until = Utc::now() + Duration::minutes(15);
    for expected in 1..=2 {
        let count = UserRepo::record_failed_login(&pool, user.id, 3, until)
            .await
            .unwrap();
        assert_eq!(count, expected);
    }
    let warned = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(warned.locked_until.is_none(), "below the limit no lock is set");

    assert_eq!(
        UserRepo::record_failed_login(&pool, user.id, 3, until).await.unwrap(),
        3
    );
    let locked = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(locked.failed_login_count, 3);
    assert!(locked.locked_until.is_some());

    UserRepo::record_successful_login(&pool, user.id).await.unwrap();
    let fresh = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(fresh.failed_login_count, 0);
    assert!(fresh.locked_until.is_none());
    assert!(fresh.last_login_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_session_lifecycle(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("di@example.com"))
        .await
        .unwrap();

    let session = SessionRepo::create(
        &pool,
        &CreateSession {
            user_id: user.id,
            refresh_token_hash: "abc123".to_string(),
            expires_at: Utc::now() + Duration::days(7),
            user_agent: None,
            ip_address: None,
        },
    )
    .await
    .unwrap();

    let live = SessionRepo::find_live(&pool, "abc123").await.unwrap();
    assert_eq!(live.map(|s| s.id), Some(session.id));

    let consumed = SessionRepo::consume(&pool, "abc123").await.unwrap();
    assert_eq!(consumed.map(|s| s.id), Some(session.id));
    assert!(
        SessionRepo::consume(&pool, "abc123").await.unwrap().is_none(),
        "a refresh token can be used once"
    );
    assert!(SessionRepo::find_live(&pool, "abc123").await.unwrap().is_none());

    assert_eq!(SessionRepo::purge_dead(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_revoke_all_and_expiry(pool: PgPool) {
    let user = UserRepo::create(&pool, &new_user("ka@example.com"))
        .await
        .unwrap();
    for (hash, days) in [("live-1", 7), ("live-2", 7), ("old", -1)] {
        SessionRepo::create(
            &pool,
            &CreateSession {
                user_id: user.id,
                refresh_token_hash: hash.to_string(),
                expires_at: Utc::now() + Duration::days(days),
                user_agent: None,
                ip_address: None,
            },
        )
        .await
        .unwrap();
    }

    assert!(SessionRepo::find_live(&pool, "old").await.unwrap().is_none());
    assert_eq!(SessionRepo::revoke_all_for_user(&pool, user.id).await.unwrap(), 3);
    assert_eq!(SessionRepo::purge_dead(&pool).await.unwrap(), 3);
}
