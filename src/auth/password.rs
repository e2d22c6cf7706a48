use actix_web::web;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::AppError;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| e.to_string())
}

/// Returns `Ok(false)` for a wrong password and `Err` only for a malformed stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| e.to_string())?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash on the blocking thread pool; argon2 is deliberately slow.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    web::block(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Hash(e.to_string()))?
        .map_err(AppError::Hash)
}

/// Verify on the blocking thread pool. A malformed stored hash counts as a mismatch.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    let outcome = web::block(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Hash(e.to_string()))?;
    match outcome {
        Ok(valid) => Ok(valid),
        Err(e) => {
            log::warn!("Stored password hash could not be parsed: {e}");
            Ok(false)
        }
    }
}
