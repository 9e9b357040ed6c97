//! Public read-only reference listings: companies, departments and roles,
//! projected to code + name so the registration and login screens can
//! populate their pickers without a token.

use axum::{extract::Query, response::Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::manager::DatabaseManager;
use crate::database::query::{self, ListCriteria};
use crate::entities;
use crate::error::ApiError;

/// GET /companies - optional name/taxId/addresses substring filters
pub async fn companies(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    listing("companies", &params).await
}

/// GET /departments - optional name substring filter
pub async fn departments(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    listing("departments", &params).await
}

/// GET /roles - optional name substring filter
pub async fn roles(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    listing("roles", &params).await
}

async fn listing(
    entity: &'static str,
    params: &HashMap<String, String>,
) -> Result<Json<Value>, ApiError> {
    let def = entities::lookup(entity)
        .ok_or_else(|| ApiError::internal(format!("unregistered reference entity: {}", entity)))?;

    let mut criteria = ListCriteria::default();
    for field in def.contains_filters {
        if let Some(value) = params.get(*field).filter(|v| !v.is_empty()) {
            criteria.contains.push((*field, value.clone()));
        }
    }

    let pool = DatabaseManager::pool().await?;
    let rows = query::list_reference(&pool, def, &criteria).await?;

    Ok(Json(json!({ "data": rows })))
}
