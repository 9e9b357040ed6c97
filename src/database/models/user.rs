use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted user record. The only entity modeled with real columns; the
/// password hash is never serialized into responses.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub cod: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub company: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub user_type: Option<String>,
    pub photo: Option<String>,
    pub terms_accepted: Option<bool>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}
