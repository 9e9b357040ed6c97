use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{verify_token, AuthError, Claims};
use crate::config;
use crate::error::ApiError;

/// Authenticated identity extracted from a verified token and attached to
/// the request context. Handlers read identity from here, never from the
/// raw header, so a revocation check can later be inserted in one place.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub cod: Uuid,
    pub email: String,
    pub role: Option<String>,
    pub photo: Option<String>,
    pub company: Option<String>,
    pub function: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            cod: claims.sub,
            email: claims.email,
            role: claims.role,
            photo: claims.photo,
            company: claims.company,
            function: claims.function,
        }
    }
}

/// Authentication gate for the protected route group.
///
/// Establishes identity only; authorization is left to handlers. Missing or
/// unverifiable credentials short-circuit with a generic 401 before any
/// handler runs.
pub async fn auth_gate(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&headers)?;
    let claims = verify_token(&token, &config::config().security.jwt_secret)?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Read the bearer credential from the Authorization header. Both the raw
/// token and the "Bearer "-prefixed form are accepted.
fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let header = headers.get("authorization").ok_or(AuthError::Missing)?;

    let value = header
        .to_str()
        .map_err(|_| AuthError::Invalid("non-ASCII Authorization header".to_string()))?;

    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        return Err(AuthError::Missing);
    }

    Ok(token.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}
