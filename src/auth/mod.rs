use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod password;

/// Identity facts embedded in an issued token. Snapshotted at login time;
/// later mutations of the user row do not propagate until the token expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User code
    pub sub: Uuid,
    pub email: String,
    /// User type (e.g. customer, technician)
    pub role: Option<String>,
    pub photo: Option<String>,
    pub company: Option<String>,
    pub function: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        sub: Uuid,
        email: String,
        role: Option<String>,
        photo: Option<String>,
        company: Option<String>,
        function: Option<String>,
        expiry_hours: u64,
    ) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub,
            email,
            role,
            photo,
            company,
            function,
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Token verification failures. The split between missing, invalid and
/// expired exists for logging and tests; every variant maps to the same
/// generic 401 at the response boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    Missing,

    #[error("token rejected: {0}")]
    Invalid(String),

    #[error("token expired")]
    Expired,

    #[error("JWT secret not configured")]
    SecretMissing,
}

/// Sign a claim set with the shared secret.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::SecretMissing);
    }

    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Invalid(e.to_string()))
}

/// Verify signature and expiry, returning the embedded claim set.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::SecretMissing);
    }

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Invalid(e.to_string()),
    })?;

    Ok(token_data.claims)
}
