//! Registration, login and profile operations.

use super::{
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    models::{LoginRequest, NewUser, ProfileUpdate, RegisterRequest, TokenPair, User, UserClaims, UserId},
    password::{PasswordHasher, PasswordPolicy},
    tokens::TokenManager,
    validation::{normalize_email, validate_email, validate_username},
};
use crate::{db::UserRepository, notify::Notifier};
use std::sync::Arc;

/// Account and session operations over a [`UserRepository`]
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
    tokens: TokenManager,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
}

impl AuthService {
    /// Create a new authentication service
    ///
    /// # Arguments
    ///
    /// * `config` - Signing secret, pepper and token lifetimes
    /// * `users` - User storage
    /// * `notifier` - Channel for registration notices
    pub fn new(config: &AuthConfig, users: Arc<dyn UserRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            users,
            notifier,
            tokens: TokenManager::new(config),
            hasher: PasswordHasher::new(config.password_pepper.clone()),
            policy: PasswordPolicy::default(),
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn policy(&self) -> PasswordPolicy {
        self.policy
    }

    /// Register a new user
    ///
    /// # Returns
    ///
    /// * `AuthResult<(User, TokenPair)>` - Created user and a fresh session
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidEmail` - Email format invalid
    /// * `AuthError::InvalidUsername` - Username format invalid
    /// * `AuthError::WeakPassword` - Password too weak
    /// * `AuthError::EmailTaken` - Email already exists
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<(User, TokenPair)> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        validate_username(&request.username)?;
        self.policy.validate(&request.password)?;

        match self.users.get_user_by_email(&email).await {
            Ok(_) => return Err(AuthError::EmailTaken),
            Err(AuthError::UserNotFound) => {}
            Err(e) => return Err(e),
        }

        let password_hash = self.hasher.hash_async(request.password).await?;
        let user = self
            .users
            .create_user(&NewUser {
                username: request.username,
                email,
                password_hash,
            })
            .await?;

        if let Err(e) = self.notifier.send_registration(&user.email, &user.username).await {
            log::warn!("Registration notice for user {} not delivered: {}", user.id, e);
        }

        let tokens = self.tokens.issue_token_pair(&user.claims())?;
        log::info!("Registered user {}", user.id);
        Ok((user, tokens))
    }

    /// Authenticate with email and password
    ///
    /// An unknown email and a wrong password produce the same error, and both
    /// paths spend one hash computation.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<(User, TokenPair)> {
        let email = normalize_email(&request.email);

        let user = match self.users.get_user_by_email(&email).await {
            Ok(user) => user,
            Err(AuthError::UserNotFound) => {
                self.hasher.equalize_timing(request.password).await;
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        self.hasher
            .verify_async(user.password_hash.clone(), request.password)
            .await
            .map_err(|_| AuthError::InvalidCredentials)?;

        let tokens = self.tokens.issue_token_pair(&user.claims())?;
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new pair
    pub fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        self.tokens.refresh_session(refresh_token)
    }

    /// Load the user identified by validated access-token claims
    ///
    /// # Errors
    ///
    /// * `AuthError::MalformedClaims` - Subject is not a user ID
    /// * `AuthError::UserNotFound` - User no longer exists
    pub async fn current_user(&self, claims: &UserClaims) -> AuthResult<User> {
        let id = claims.numeric_id().ok_or(AuthError::MalformedClaims)?;
        self.users.get_user_by_id(id).await
    }

    /// Apply a partial profile update on behalf of the authenticated caller
    ///
    /// # Errors
    ///
    /// * `AuthError::Forbidden` - `target` is not the caller's own ID
    /// * `AuthError::InvalidEmail` / `AuthError::InvalidUsername` - Bad new values
    /// * `AuthError::WeakPassword` - New password fails the policy
    /// * `AuthError::EmailTaken` - New email belongs to another user
    pub async fn update_profile(
        &self,
        claims: &UserClaims,
        target: UserId,
        changes: ProfileUpdate,
    ) -> AuthResult<User> {
        if claims.numeric_id() != Some(target) {
            return Err(AuthError::Forbidden);
        }

        let mut user = self.users.get_user_by_id(target).await?;

        if let Some(username) = changes.username {
            validate_username(&username)?;
            user.username = username;
        }

        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            validate_email(&email)?;
            user.email = email;
        }

        if let Some(password) = changes.password {
            self.policy.validate(&password)?;
            user.password_hash = self.hasher.hash_async(password).await?;
        }

        self.users.update_user(&user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryUserRepository, notify::LogNotifier};

    fn service() -> AuthService {
        AuthService::new(
            &AuthConfig::new("test_secret_key_for_jwt_signing_0123456789"),
            Arc::new(MemoryUserRepository::new()),
            Arc::new(LogNotifier),
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: "bob".to_string(),
            password: "GoodPass1!".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        let (user, tokens) = service
            .register(register_request("Bob@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.email, "bob@example.com");
        assert_eq!(
            service.tokens().validate_access(&tokens.access_token).unwrap(),
            user.claims()
        );

        let (logged_in, _) = service
            .login(LoginRequest {
                email: "bob@example.com".to_string(),
                password: "GoodPass1!".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let service = service();
        service.register(register_request("bob@example.com")).await.unwrap();
        assert!(matches!(
            service.register(register_request("BOB@example.com")).await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let service = service();
        let mut request = register_request("bob@example.com");
        request.password = "longenough1".to_string();
        assert!(matches!(
            service.register(request).await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let service = service();
        service.register(register_request("bob@example.com")).await.unwrap();

        let wrong_password = service
            .login(LoginRequest {
                email: "bob@example.com".to_string(),
                password: "WrongPass1!".to_string(),
            })
            .await
            .unwrap_err();
        let unknown_user = service
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "GoodPass1!".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.client_message(), unknown_user.client_message());
    }

    #[tokio::test]
    async fn test_update_own_profile() {
        let service = service();
        let (user, _) = service.register(register_request("bob@example.com")).await.unwrap();

        let updated = service
            .update_profile(
                &user.claims(),
                user.id,
                ProfileUpdate {
                    username: Some("robert".to_string()),
                    password: Some("NewPass2@".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "robert");

        assert!(service
            .login(LoginRequest {
                email: "bob@example.com".to_string(),
                password: "NewPass2@".to_string(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_other_profile_forbidden() {
        let service = service();
        let (user, _) = service.register(register_request("bob@example.com")).await.unwrap();

        assert!(matches!(
            service
                .update_profile(&user.claims(), user.id + 1, ProfileUpdate::default())
                .await,
            Err(AuthError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_current_user_with_foreign_subject() {
        let service = service();
        let claims = UserClaims {
            user_id: "not-a-number".to_string(),
            email: "x@example.com".to_string(),
        };
        assert!(matches!(
            service.current_user(&claims).await,
            Err(AuthError::MalformedClaims)
        ));
    }
}
