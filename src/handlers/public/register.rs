use axum::{http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::password;
use crate::database::manager::{classify, DatabaseError, DatabaseManager};
use crate::database::models::User;
use crate::database::query::parse_date;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub company: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub user_type: Option<String>,
    pub photo: Option<String>,
    pub terms_accepted: Option<bool>,
    pub status: Option<String>,
}

/// POST /auth/register - Create a new user account
///
/// Email uniqueness is checked before insert, and the unique constraint is
/// still mapped to the same 400 in case a concurrent registration wins the
/// race between check and insert.
pub async fn register(
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let email = payload
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("Email and password are required."))?;
    let plaintext = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Email and password are required."))?;

    let birth_date: Option<DateTime<Utc>> = match payload.birth_date.as_deref() {
        Some(raw) => Some(
            parse_date(raw).ok_or_else(|| ApiError::bad_request("Dates provided are not valid."))?,
        ),
        None => None,
    };

    let pool = DatabaseManager::pool().await?;

    let taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .map_err(classify)?;
    if taken > 0 {
        return Err(ApiError::bad_request("Email is already in use."));
    }

    let hash = password::hash_password(&plaintext)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users \
         (cod, email, password, name, phone, gender, birth_date, company, department, \
          role, user_type, photo, terms_accepted, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&hash)
    .bind(&payload.name)
    .bind(&payload.phone)
    .bind(&payload.gender)
    .bind(birth_date)
    .bind(&payload.company)
    .bind(&payload.department)
    .bind(&payload.role)
    .bind(&payload.user_type)
    .bind(&payload.photo)
    .bind(payload.terms_accepted)
    .bind(&payload.status)
    .fetch_one(&pool)
    .await
    .map_err(classify)
    .map_err(|e| match e {
        DatabaseError::UniqueViolation(_) => ApiError::bad_request("Email is already in use."),
        other => other.into(),
    })?;

    tracing::info!(user = %user.cod, "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}
