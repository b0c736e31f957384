//! Integration tests for the users domain against PostgreSQL and Redis
//!
//! Containers are started per test, so these are ignored by default:
//! `cargo test -p domain_users -- --ignored`.

use axum_helpers::{JwtAuth, JwtConfig};
use domain_users::*;
use redis::AsyncCommands;
use test_utils::{TestDataBuilder, TestDatabase, TestRedis};

const PASSWORD: &str = "Str0ng!pass";

fn auth() -> JwtAuth {
    JwtAuth::new(&JwtConfig::new("integration-secret-with-at-least-32-chars").unwrap())
}

fn input(email: String) -> CreateUser {
    CreateUser {
        email,
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        password: PASSWORD.to_string(),
        role: None,
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_create_login_and_soft_delete() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("pg_user_lifecycle");
    let service = UserService::new(PgUserRepository::new(db.connection()), auth());

    let email = builder.email("grace");
    let user = service.create_user(input(email.clone()), None).await.unwrap();
    assert_eq!(user.role, Role::User);
    assert_eq!(user.rating, 0);

    let fetched = service.get_user(user.id).await.unwrap();
    assert_eq!(fetched.email, email);

    let login = service
        .login(LoginRequest {
            email: email.to_uppercase(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    assert!(!login.access_token.is_empty());

    let admin = Actor {
        user_id: builder.nth_user_id(99),
        role: Role::Admin,
    };
    let deleted = service.delete_user(&admin, user.id).await.unwrap();
    assert_eq!(deleted.user_id, user.id);

    assert!(matches!(
        service.get_user(user.id).await,
        Err(UserError::NotFound(_))
    ));
    assert_eq!(service.count_users().await.unwrap(), 0);

    // The address stays taken after a soft delete.
    let again = service.create_user(input(email), None).await;
    assert!(matches!(again, Err(UserError::DuplicateEmail(_))));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_update_keeps_rating_and_bumps_updated_at() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("pg_user_update");
    let service = UserService::new(PgUserRepository::new(db.connection()), auth());

    let user = service
        .create_user(input(builder.email("update")), None)
        .await
        .unwrap();
    let me = Actor {
        user_id: user.id,
        role: Role::User,
    };

    let updated = service
        .update_user(
            &me,
            user.id,
            UpdateUser {
                last_name: Some("Murray".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.last_name, "Murray");
    assert_eq!(updated.rating, 0);
    assert!(updated.updated_at >= user.updated_at);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_list_pages() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("pg_user_list");
    let service = UserService::new(PgUserRepository::new(db.connection()), auth());

    for i in 0..5 {
        service
            .create_user(input(builder.email(&format!("page{}", i))), None)
            .await
            .unwrap();
    }

    let page = service
        .list_users(ListQuery {
            page: Some(2),
            page_size: Some(2),
        })
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
    assert_eq!(service.count_users().await.unwrap(), 5);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_redis_cache_serves_and_invalidates_user() {
    let db = TestDatabase::new().await;
    let redis = TestRedis::new().await;
    let builder = TestDataBuilder::from_test_name("redis_user_cache");

    let service = UserService::new(PgUserRepository::new(db.connection()), auth())
        .with_cache(RedisUserCache::new(redis.connection()));

    let user = service
        .create_user(input(builder.email("cached")), None)
        .await
        .unwrap();
    service.get_user(user.id).await.unwrap();

    let mut conn = redis.connection();
    let key = cache::user_key(user.id);
    let cached: Option<String> = conn.get(&key).await.unwrap();
    let cached = cached.expect("user should be cached after a read");
    assert!(!cached.contains("password_hash"));

    let ttl: i64 = conn.ttl(&key).await.unwrap();
    assert!(ttl > 0 && ttl <= cache::DEFAULT_TTL_SECS as i64);

    let me = Actor {
        user_id: user.id,
        role: Role::User,
    };
    service
        .update_user(
            &me,
            user.id,
            UpdateUser {
                first_name: Some("Amazing".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let exists: bool = conn.exists(&key).await.unwrap();
    assert!(!exists);
    assert_eq!(service.get_user(user.id).await.unwrap().first_name, "Amazing");
}
