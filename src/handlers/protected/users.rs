//! Protected user management: paginated listing, update (with password
//! re-hash), delete, and the distinct user-type listing. Users are the one
//! entity with real columns, so these handlers are typed rather than going
//! through the generic document layer.

use axum::{
    extract::{Path, Query},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::password;
use crate::database::manager::{classify, DatabaseError, DatabaseManager};
use crate::database::models::User;
use crate::database::query::parse_date;
use crate::entities::Pagination;
use crate::error::ApiError;

/// Body fields accepted on update, paired with their columns: (wire
/// camelCase name, column name). One table doubles as the validation
/// whitelist and the column mapping, so no field can be accepted without
/// a column to land in.
const UPDATABLE_FIELDS: &[(&str, &str)] = &[
    ("email", "email"),
    ("password", "password"),
    ("name", "name"),
    ("phone", "phone"),
    ("gender", "gender"),
    ("birthDate", "birth_date"),
    ("company", "company"),
    ("department", "department"),
    ("role", "role"),
    ("userType", "user_type"),
    ("photo", "photo"),
    ("termsAccepted", "terms_accepted"),
    ("status", "status"),
];

fn column_for(field: &str) -> Option<&'static str> {
    UPDATABLE_FIELDS
        .iter()
        .find(|(wire, _)| *wire == field)
        .map(|(_, column)| *column)
}

/// Typed bind value for the dynamically-assembled UPDATE.
enum Bind {
    Text(Option<String>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
}

fn bind_for(field: &str, value: &Value) -> Result<Bind, ApiError> {
    match field {
        "termsAccepted" => match value {
            Value::Null => Ok(Bind::Bool(None)),
            Value::Bool(b) => Ok(Bind::Bool(Some(*b))),
            _ => Err(ApiError::bad_request("Field 'termsAccepted' must be a boolean.")),
        },
        "birthDate" => match value {
            Value::Null => Ok(Bind::Timestamp(None)),
            Value::String(raw) => parse_date(raw)
                .map(|dt| Bind::Timestamp(Some(dt)))
                .ok_or_else(|| ApiError::bad_request("Dates provided are not valid.")),
            _ => Err(ApiError::bad_request("Field 'birthDate' must be a date string.")),
        },
        "password" => match value {
            Value::String(raw) if !raw.is_empty() => {
                // A supplied password is always stored re-hashed
                Ok(Bind::Text(Some(password::hash_password(raw)?)))
            }
            _ => Err(ApiError::bad_request("Field 'password' must be a non-empty string.")),
        },
        _ => match value {
            Value::Null => Ok(Bind::Text(None)),
            Value::String(s) => Ok(Bind::Text(Some(s.clone()))),
            _ => Err(ApiError::bad_request(format!(
                "Field '{}' must be a string.",
                field
            ))),
        },
    }
}

/// GET /api/users - Paginated user listing
pub async fn list(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let pagination = Pagination::from_params(
        params.get("page").map(|s| s.as_str()),
        params.get("limit").map(|s| s.as_str()),
    )?;

    let pool = DatabaseManager::pool().await?;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .map_err(classify)?;

    // Ordered by creation so pages are stable between requests
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users ORDER BY created_at LIMIT $1 OFFSET $2",
    )
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(&pool)
    .await
    .map_err(classify)?;

    Ok(Json(json!({
        "total": total,
        "page": pagination.page,
        "limit": pagination.limit,
        "totalPages": pagination.total_pages(total),
        "data": users,
    })))
}

/// PUT /api/users/:cod - Apply the supplied fields to the user record
pub async fn update(
    Path(cod): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<User>, ApiError> {
    let cod = parse_cod(&cod)?;
    let body = validated_body(payload)?;
    if body.is_empty() {
        return Err(ApiError::bad_request("No fields to update."));
    }

    let mut assignments = Vec::new();
    let mut binds = Vec::new();
    for (field, value) in &body {
        let column = column_for(field)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown field '{}'.", field)))?;
        binds.push(bind_for(field, value)?);
        assignments.push(format!("{} = ${}", column, binds.len()));
    }

    let sql = format!(
        "UPDATE users SET {} WHERE cod = ${} RETURNING *",
        assignments.join(", "),
        binds.len() + 1
    );

    let mut q = sqlx::query_as::<_, User>(&sql);
    for bind in binds {
        q = match bind {
            Bind::Text(v) => q.bind(v),
            Bind::Bool(v) => q.bind(v),
            Bind::Timestamp(v) => q.bind(v),
        };
    }

    let pool = DatabaseManager::pool().await?;
    let user = q
        .bind(cod)
        .fetch_optional(&pool)
        .await
        .map_err(classify)
        .map_err(|e| match e {
            DatabaseError::UniqueViolation(_) => {
                ApiError::bad_request("Email is already in use.")
            }
            other => other.into(),
        })?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::not_found("User not found.")),
    }
}

/// DELETE /api/users/:cod - Remove the user, echoing the deleted record
pub async fn remove(Path(cod): Path<String>) -> Result<Json<Value>, ApiError> {
    let cod = parse_cod(&cod)?;

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>("DELETE FROM users WHERE cod = $1 RETURNING *")
        .bind(cod)
        .fetch_optional(&pool)
        .await
        .map_err(classify)?;

    match user {
        Some(user) => Ok(Json(json!({
            "message": "User deleted successfully.",
            "user": user,
        }))),
        None => Err(ApiError::not_found("User not found.")),
    }
}

/// GET /api/users/types - Distinct user-type values in use
pub async fn types() -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let types = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT user_type FROM users WHERE user_type IS NOT NULL ORDER BY user_type",
    )
    .fetch_all(&pool)
    .await
    .map_err(classify)?;

    Ok(Json(json!({ "types": types })))
}

fn parse_cod(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("User not found."))
}

fn validated_body(payload: Value) -> Result<Map<String, Value>, ApiError> {
    let body = match payload {
        Value::Object(map) => map,
        _ => return Err(ApiError::bad_request("Request body must be a JSON object.")),
    };

    for key in body.keys() {
        if column_for(key).is_none() {
            return Err(ApiError::bad_request(format!("Unknown field '{}'.", key)));
        }
    }

    Ok(body)
}
