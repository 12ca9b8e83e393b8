// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Scrypt,
};

use crate::error::AppError;

/// Hash a password using scrypt with its recommended work factor.
///
/// The result is a PHC string carrying the salt and parameters.
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AppError::Hashing(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Verify a password against a hash.
///
/// A malformed hash is just another failed verification.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

/// [`hash_password`] on the blocking pool, off the async workers
pub async fn hash_password_blocking(plain: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_blocking(hash: String, plain: String) -> Result<bool, AppError> {
    Ok(tokio::task::spawn_blocking(move || verify_password(&hash, &plain)).await?)
}
