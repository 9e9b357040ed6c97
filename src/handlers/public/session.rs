use axum::{http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{issue_token, password, Claims};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /auth/login - Authenticate and receive a signed token
///
/// Unknown email and wrong password produce byte-identical 401 responses so
/// the endpoint cannot be used to enumerate accounts.
pub async fn login(Json(payload): Json<LoginRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (email, plaintext) = match (payload.email, payload.password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => return Err(ApiError::bad_request("Email and password are required.")),
    };

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await
        .map_err(crate::database::manager::classify)?;

    let user = match user {
        Some(user) => user,
        None => return Err(ApiError::Unauthorized),
    };

    if !password::verify_password(&plaintext, &user.password)? {
        return Err(ApiError::Unauthorized);
    }

    let security = &config::config().security;
    let claims = Claims::new(
        user.cod,
        user.email.clone(),
        user.user_type.clone(),
        user.photo.clone(),
        user.company.clone(),
        user.role.clone(),
        security.jwt_expiry_hours,
    );
    let token = issue_token(&claims, &security.jwt_secret)?;

    tracing::info!(user = %user.cod, "login succeeded");

    Ok((
        StatusCode::OK,
        Json(json!({
            "token": token,
            "user": {
                "cod": user.cod,
                "name": user.name,
                "email": user.email,
                "userType": user.user_type,
                "photo": user.photo,
                "company": user.company,
                "role": user.role,
            },
        })),
    ))
}
