//! services/web/src/credentials.rs
//!
//! Password hashing and credential verification, independent of the web layer.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use listings_core::{Account, AccountStore, PortError};
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown identifier or wrong secret. Deliberately does not say which.
    #[error("incorrect username or password")]
    InvalidCredentials,
    #[error("Account store error: {0}")]
    Store(PortError),
    #[error("Password hashing error: {0}")]
    Hash(String),
}

/// Hashes a password into a salted Argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            AuthError::Hash(e.to_string())
        })
}

/// Checks `secret` against the stored hash for `identifier`.
pub async fn verify(
    accounts: &dyn AccountStore,
    identifier: &str,
    secret: &str,
) -> Result<Account, AuthError> {
    let credentials = match accounts.get_credentials_by_username(identifier).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => {
            warn!("Login attempt for unknown account");
            return Err(AuthError::InvalidCredentials);
        }
        Err(e) => return Err(AuthError::Store(e)),
    };

    let parsed_hash = PasswordHash::new(&credentials.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        AuthError::Hash(e.to_string())
    })?;

    if Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!(account_id = %credentials.account_id, "Login attempt with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    Ok(credentials.to_account())
}
