//! Account signup and login.
//!
//! Passwords are stored as argon2id PHC strings and never in plaintext. Both
//! operations end by opening a session, so a successful signup logs the
//! account in without a second round trip.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use uuid::Uuid;

use crate::error::AnalyticsError;
use crate::models::{AuthResponse, Credentials, User};
use crate::store::SampleStore;

/// Hash a plaintext password into an argon2id PHC string.
///
/// Hashing is CPU intensive so it runs on the blocking thread pool.
async fn hash_password(password: String) -> Result<String, AnalyticsError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    })
    .await?
}

/// Check a plaintext password against a stored PHC string.
///
/// A mismatch is reported as invalid credentials. A stored hash that cannot
/// be parsed is an internal error, not an authentication failure.
async fn verify_password(password: String, password_hash: String) -> Result<(), AnalyticsError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(argon2::password_hash::Error::Password) => Err(AnalyticsError::InvalidCredentials),
            Err(err) => Err(err.into()),
        }
    })
    .await?
}

async fn issue_session(
    store: &SampleStore,
    user: User,
) -> Result<AuthResponse, AnalyticsError> {
    let token = Uuid::new_v4().to_string();
    store.create_session(user.id, token.clone()).await?;
    Ok(AuthResponse {
        id: user.id,
        email: user.email,
        token,
    })
}

/// Register a new account and open a session for it.
pub async fn signup(
    store: &SampleStore,
    credentials: Credentials,
) -> Result<AuthResponse, AnalyticsError> {
    let password_hash = hash_password(credentials.password).await?;
    let user = store.create_user(credentials.email, password_hash).await?;
    issue_session(store, user).await
}

/// Authenticate an existing account and open a session for it.
///
/// Unknown emails and wrong passwords produce the same error, so a caller
/// cannot probe which accounts exist.
pub async fn login(
    store: &SampleStore,
    credentials: Credentials,
) -> Result<AuthResponse, AnalyticsError> {
    let user = store
        .user_by_email(credentials.email)
        .await?
        .ok_or(AnalyticsError::InvalidCredentials)?;
    verify_password(credentials.password, user.password_hash.clone()).await?;
    issue_session(store, user).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[tokio::test]
    async fn test_signup_returns_account_and_token() {
        let store = SampleStore::in_memory().unwrap();
        let response = signup(&store, test_utils::get_test_credentials())
            .await
            .unwrap();
        assert_eq!(response.id, 1);
        assert_eq!(response.email, "alice@example.com");
        Uuid::parse_str(&response.token).unwrap();
    }

    #[tokio::test]
    async fn test_signup_stores_hash_not_plaintext() {
        let store = SampleStore::in_memory().unwrap();
        signup(&store, test_utils::get_test_credentials())
            .await
            .unwrap();
        let user = store
            .user_by_email("alice@example.com".to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_ne!(user.password_hash, "hunter2");
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let store = SampleStore::in_memory().unwrap();
        signup(&store, test_utils::get_test_credentials())
            .await
            .unwrap();
        let error = signup(&store, test_utils::get_test_credentials())
            .await
            .unwrap_err();
        assert!(matches!(error, AnalyticsError::EmailExists));
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let store = SampleStore::in_memory().unwrap();
        let signed_up = signup(&store, test_utils::get_test_credentials())
            .await
            .unwrap();
        let logged_in = login(&store, test_utils::get_test_credentials())
            .await
            .unwrap();
        assert_eq!(logged_in.id, signed_up.id);
        assert_eq!(logged_in.email, signed_up.email);
        // Each login opens a fresh session.
        assert_ne!(logged_in.token, signed_up.token);
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let store = SampleStore::in_memory().unwrap();
        let error = login(&store, test_utils::get_test_credentials())
            .await
            .unwrap_err();
        assert!(matches!(error, AnalyticsError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let store = SampleStore::in_memory().unwrap();
        signup(&store, test_utils::get_test_credentials())
            .await
            .unwrap();
        let credentials = Credentials {
            email: "alice@example.com".to_string(),
            password: "hunter3".to_string(),
        };
        let error = login(&store, credentials).await.unwrap_err();
        assert!(matches!(error, AnalyticsError::InvalidCredentials));
    }
}
