//! Password hashing and verification using bcrypt

use crate::config;
use crate::error::ApiError;

/// Hash a plaintext password with the configured work factor.
pub fn hash_password(plaintext: &str) -> Result<String, ApiError> {
    bcrypt::hash(plaintext, config::config().security.bcrypt_cost)
        .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored hash.
pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool, ApiError> {
    bcrypt::verify(plaintext, hash)
        .map_err(|e| ApiError::internal(format!("password verification failed: {}", e)))
}
