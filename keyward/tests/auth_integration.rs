//! Integration tests for the authentication system.
//!
//! Tests registration, login, token expiry and refresh rotation against the
//! in-memory user store.

use chrono::Duration;
use keyward::auth::{
    AuthConfig, AuthError, AuthService, LoginRequest, ProfileUpdate, RegisterRequest,
};
use keyward::cache::MemoryCache;
use keyward::db::{CachedUserRepository, MemoryUserRepository, UserRepository};
use keyward::notify::LogNotifier;
use std::sync::Arc;

const SECRET: &str = "test_secret_key_for_jwt_signing_0123456789";

/// Helper to create a service with custom token lifetimes
fn setup_auth_service(access: Duration, refresh: Duration) -> AuthService {
    let config = AuthConfig::new(SECRET)
        .with_pepper("integration_pepper_value")
        .with_ttls(access, refresh);
    AuthService::new(
        &config,
        Arc::new(MemoryUserRepository::new()),
        Arc::new(LogNotifier),
    )
}

fn bob() -> RegisterRequest {
    RegisterRequest {
        email: "bob@example.com".to_string(),
        username: "bob".to_string(),
        password: "GoodPass1!".to_string(),
    }
}

#[tokio::test]
async fn test_stale_access_token_then_refresh() {
    let auth = setup_auth_service(Duration::seconds(1), Duration::days(7));
    auth.register(bob()).await.expect("Registration should succeed");

    let (user, tokens) = auth
        .login(LoginRequest {
            email: "bob@example.com".to_string(),
            password: "GoodPass1!".to_string(),
        })
        .await
        .expect("Login should succeed");

    let claims = auth.tokens().validate_access(&tokens.access_token).unwrap();
    assert_eq!(auth.current_user(&claims).await.unwrap().id, user.id);

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    let stale = auth.tokens().validate_access(&tokens.access_token);
    assert!(
        matches!(stale, Err(AuthError::TokenExpired)),
        "Stale access token should be rejected"
    );

    let rotated = auth
        .refresh(&tokens.refresh_token)
        .expect("Refresh should succeed");
    let claims = auth
        .tokens()
        .validate_access(&rotated.access_token)
        .expect("New access token should be valid");
    assert_eq!(auth.current_user(&claims).await.unwrap().email, "bob@example.com");
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let auth = setup_auth_service(Duration::minutes(15), Duration::days(7));
    let (_, tokens) = auth.register(bob()).await.unwrap();

    assert!(matches!(
        auth.refresh(&tokens.access_token),
        Err(AuthError::WrongTokenType)
    ));
}

#[tokio::test]
async fn test_refresh_token_cannot_authorize() {
    let auth = setup_auth_service(Duration::minutes(15), Duration::days(7));
    let (_, tokens) = auth.register(bob()).await.unwrap();

    assert!(matches!(
        auth.tokens().validate_access(&tokens.refresh_token),
        Err(AuthError::WrongTokenType)
    ));
}

#[tokio::test]
async fn test_tokens_from_other_secret_rejected() {
    let auth = setup_auth_service(Duration::minutes(15), Duration::days(7));
    let other = AuthService::new(
        &AuthConfig::new("a_completely_different_secret_value_here"),
        Arc::new(MemoryUserRepository::new()),
        Arc::new(LogNotifier),
    );
    let (_, tokens) = other.register(bob()).await.unwrap();

    assert!(matches!(
        auth.tokens().validate_access(&tokens.access_token),
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_profile_update_through_cached_store() {
    let store: Arc<dyn UserRepository> = Arc::new(MemoryUserRepository::new());
    let cached = Arc::new(CachedUserRepository::new(
        store,
        Arc::new(MemoryCache::new()),
        std::time::Duration::from_secs(60),
    ));
    let auth = AuthService::new(&AuthConfig::new(SECRET), cached, Arc::new(LogNotifier));

    let (user, tokens) = auth.register(bob()).await.unwrap();
    let claims = auth.tokens().validate_access(&tokens.access_token).unwrap();
    assert_eq!(auth.current_user(&claims).await.unwrap().username, "bob");

    auth.update_profile(
        &claims,
        user.id,
        ProfileUpdate {
            username: Some("bobby".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(auth.current_user(&claims).await.unwrap().username, "bobby");
}

#[tokio::test]
async fn test_concurrent_registrations_one_winner() {
    let auth = Arc::new(setup_auth_service(Duration::minutes(15), Duration::days(7)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let auth = auth.clone();
            tokio::spawn(async move { auth.register(bob()).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert!(matches!(e, AuthError::EmailTaken)),
        }
    }
    assert_eq!(successes, 1);
}
