//! Password hashing with argon2.
//!
//! Hashing and verification are CPU-bound, so handlers go through the async
//! wrappers, which run them on tokio's blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;
use tracing::{error, warn};

use crate::error::AppError;

/// Hash verified in place of a missing account's, so an unknown email costs
/// the same argon2 work as a wrong password.
static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Hashes `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Checks `password` against a stored PHC string. A malformed hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

fn dummy_hash() -> &'static str {
    DUMMY_HASH.get_or_init(|| {
        let seed = uuid::Uuid::new_v4().simple().to_string();
        hash_password(&seed).unwrap_or_else(|e| {
            error!("Could not build the placeholder password hash: {}", e);
            String::new()
        })
    })
}

/// The hash a login attempt is verified against: the account's, or the
/// placeholder when no account matched.
fn credential_hash(stored_hash: Option<&str>) -> &str {
    match stored_hash {
        Some(hash) => hash,
        None => dummy_hash(),
    }
}

/// Verifies a login attempt. Runs the full argon2 check whether or not the
/// account exists; a missing account never verifies.
pub fn check_credentials(password: &str, stored_hash: Option<&str>) -> bool {
    let matched = verify_password(password, credential_hash(stored_hash));
    matched && stored_hash.is_some()
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {}", e)))?
}

/// [`check_credentials`] on the blocking pool.
pub async fn check_credentials_blocking(password: String, stored_hash: Option<String>) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || check_credentials(&password, stored_hash.as_deref()))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {}", e)))
}
