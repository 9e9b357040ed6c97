// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-safe messages.
///
/// Every handler boundary converts into one of these; the response body is
/// always the same envelope: `{"message": ..., "code": ...}`.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request (missing field, unparseable date, duplicate unique value)
    BadRequest(String),

    // 401 Unauthorized. Carries no detail: missing, malformed and expired
    // credentials (and bad login credentials) must be indistinguishable
    // to the caller.
    Unauthorized,

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error. The detail is logged, never returned.
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized => "Invalid credentials.",
            ApiError::NotFound(msg) => msg,
            ApiError::Internal(_) => "An unexpected error occurred.",
        }
    }

    /// Stable error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "message": self.message(),
            "code": self.error_code(),
        })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Internal(detail.into())
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        use crate::database::manager::DatabaseError;
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::UniqueViolation(field) => {
                ApiError::bad_request(format!("Value for '{}' is already in use.", field))
            }
            DatabaseError::ConfigMissing(var) => {
                ApiError::internal(format!("missing configuration: {}", var))
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<crate::auth::AuthError> for ApiError {
    fn from(err: crate::auth::AuthError) -> Self {
        use crate::auth::AuthError;
        match err {
            // The sub-cause matters for logging, never for the response
            AuthError::Missing | AuthError::Invalid(_) | AuthError::Expired => {
                tracing::debug!("authentication rejected: {}", err);
                ApiError::Unauthorized
            }
            AuthError::SecretMissing => ApiError::internal("JWT secret not configured"),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!("internal error: {}", detail);
        }
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_has_message_and_code() {
        let body = ApiError::bad_request("Dates provided are not valid.").to_json();
        assert_eq!(body["message"], "Dates provided are not valid.");
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let body = ApiError::internal("connection refused to 10.0.0.5:5432").to_json();
        assert_eq!(body["message"], "An unexpected error occurred.");
        assert!(!body.to_string().contains("10.0.0.5"));
    }

    #[test]
    fn unauthorized_message_is_uniform() {
        // Same body regardless of how the error was produced
        assert_eq!(ApiError::Unauthorized.to_json(), ApiError::Unauthorized.to_json());
        assert_eq!(ApiError::Unauthorized.message(), "Invalid credentials.");
    }
}
