//! Generic CRUD handlers for the opaque business entities.
//!
//! One handler per operation, parameterized by the `EntityDef` registry
//! entry resolved from the `:entity` path segment, instead of fifteen
//! near-identical copies. The registry decides which filters, ordering and
//! pagination each entity's list route offers.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::query::{self, parse_date, ListCriteria};
use crate::entities::{self, DateSource, EntityDef, Pagination};
use crate::error::ApiError;

fn resolve(entity: &str) -> Result<&'static EntityDef, ApiError> {
    entities::lookup(entity)
        .ok_or_else(|| ApiError::not_found(format!("Unknown resource '{}'.", entity)))
}

fn parse_cod(raw: &str) -> Result<Uuid, ApiError> {
    // Codes are always server-generated UUIDs; anything else cannot exist
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Record not found."))
}

/// Validate a create/update body: must be a JSON object, and every field
/// must be one the entity declares. If the entity orders or filters on a
/// field inside the body, that field must hold a parseable date; a stored
/// non-date value would make every subsequent list query fail its cast.
fn validated_body(def: &EntityDef, payload: Value) -> Result<Map<String, Value>, ApiError> {
    let body = match payload {
        Value::Object(map) => map,
        _ => return Err(ApiError::bad_request("Request body must be a JSON object.")),
    };

    for key in body.keys() {
        if !def.columns.contains(&key.as_str()) {
            return Err(ApiError::bad_request(format!("Unknown field '{}'.", key)));
        }
    }

    if let Some(DateSource::Field(field)) = def.date_filter {
        if let Some(value) = body.get(field) {
            let valid = value.as_str().and_then(parse_date).is_some();
            if !valid {
                return Err(ApiError::bad_request("Dates provided are not valid."));
            }
        }
    }

    Ok(body)
}

/// Build list criteria from the query string, honoring only the filters the
/// entity declares. An unparseable dataInicio/dataFim is a 400; an inverted
/// range simply matches nothing.
fn criteria_from_params(
    def: &'static EntityDef,
    params: &HashMap<String, String>,
) -> Result<ListCriteria, ApiError> {
    let mut criteria = ListCriteria::default();

    for field in def.contains_filters {
        if let Some(value) = params.get(*field).filter(|v| !v.is_empty()) {
            criteria.contains.push((*field, value.clone()));
        }
    }
    for field in def.equals_filters {
        if let Some(value) = params.get(*field).filter(|v| !v.is_empty()) {
            criteria.equals.push((*field, value.clone()));
        }
    }

    if def.date_filter.is_some() {
        for (param, slot) in [
            ("dataInicio", &mut criteria.date_from),
            ("dataFim", &mut criteria.date_to),
        ] {
            if let Some(raw) = params.get(param).filter(|v| !v.is_empty()) {
                *slot = Some(
                    parse_date(raw)
                        .ok_or_else(|| ApiError::bad_request("Dates provided are not valid."))?,
                );
            }
        }
    }

    Ok(criteria)
}

/// GET /api/:entity - List records with the entity's declared filters
pub async fn list(
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let def = resolve(&entity)?;
    let mut criteria = criteria_from_params(def, &params)?;
    let pool = DatabaseManager::pool().await?;

    if def.paginated {
        let pagination =
            Pagination::from_params(params.get("page").map(|s| s.as_str()), params.get("limit").map(|s| s.as_str()))?;
        criteria.limit = Some(pagination.limit);
        criteria.offset = Some(pagination.offset());

        let total = query::count(&pool, def, &criteria).await?;
        let rows = query::list(&pool, def, &criteria).await?;

        return Ok(Json(json!({
            "total": total,
            "page": pagination.page,
            "limit": pagination.limit,
            "totalPages": pagination.total_pages(total),
            "data": rows,
        })));
    }

    let rows = query::list(&pool, def, &criteria).await?;
    Ok(Json(json!({ "data": rows })))
}

/// POST /api/:entity - Create a record from the wholesale body
pub async fn create(
    Path(entity): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let def = resolve(&entity)?;
    let body = validated_body(def, payload)?;

    let pool = DatabaseManager::pool().await?;
    let record = query::insert(&pool, def, body).await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/:entity/:cod - Fetch one record by code
pub async fn get_one(
    Path((entity, cod)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let def = resolve(&entity)?;
    let cod = parse_cod(&cod)?;

    let pool = DatabaseManager::pool().await?;
    match query::fetch(&pool, def, cod).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::not_found("Record not found.")),
    }
}

/// PUT /api/:entity/:cod - Merge the supplied fields into the record
pub async fn update(
    Path((entity, cod)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let def = resolve(&entity)?;
    let cod = parse_cod(&cod)?;
    let body = validated_body(def, payload)?;

    let pool = DatabaseManager::pool().await?;
    match query::update(&pool, def, cod, body).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::not_found("Record not found.")),
    }
}

/// DELETE /api/:entity/:cod - Remove the record, echoing it back
pub async fn remove(
    Path((entity, cod)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let def = resolve(&entity)?;
    let cod = parse_cod(&cod)?;

    let pool = DatabaseManager::pool().await?;
    match query::remove(&pool, def, cod).await? {
        Some(record) => Ok(Json(json!({
            "message": "Record deleted successfully.",
            "record": record,
        }))),
        // Deleting an already-deleted code is a deterministic 404, not a crash
        None => Err(ApiError::not_found("Record not found.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entity_is_not_found() {
        assert!(matches!(resolve("bogus"), Err(ApiError::NotFound(_))));
        assert!(resolve("tickets").is_ok());
    }

    #[test]
    fn body_must_be_an_object_with_known_fields() {
        let def = resolve("faqs").unwrap();

        assert!(validated_body(def, json!(["a", "b"])).is_err());
        assert!(validated_body(def, json!({"question": "Q?", "answer": "A."})).is_ok());

        let err = validated_body(def, json!({"question": "Q?", "rating": 5})).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("rating")));
    }

    #[test]
    fn date_bearing_field_must_hold_a_parseable_date() {
        let def = resolve("schedules").unwrap();

        // A stored non-date would poison the list route's ORDER BY cast
        let err = validated_body(def, json!({"date": "tomorrow"})).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "Dates provided are not valid."));
        assert!(validated_body(def, json!({"date": 20240501})).is_err());
        assert!(validated_body(def, json!({"date": Value::Null})).is_err());

        assert!(validated_body(def, json!({"date": "2024-05-01"})).is_ok());
        assert!(validated_body(def, json!({"date": "2024-05-01T09:30:00Z"})).is_ok());

        // Entities without a body date field are unaffected
        let faqs = resolve("faqs").unwrap();
        assert!(validated_body(faqs, json!({"question": "Q?"})).is_ok());
    }

    #[test]
    fn undeclared_filter_params_are_ignored() {
        let def = resolve("schedules").unwrap();
        let mut params = HashMap::new();
        params.insert("status".to_string(), "open".to_string());
        params.insert("priority".to_string(), "high".to_string()); // not declared

        let criteria = criteria_from_params(def, &params).unwrap();
        assert_eq!(criteria.contains.len(), 1);
        assert!(criteria.equals.is_empty());
    }

    #[test]
    fn bad_date_params_are_rejected() {
        let def = resolve("tickets").unwrap();
        let mut params = HashMap::new();
        params.insert("dataInicio".to_string(), "not-a-date".to_string());

        assert!(matches!(
            criteria_from_params(def, &params),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn inverted_date_range_builds_rather_than_erroring() {
        let def = resolve("tickets").unwrap();
        let mut params = HashMap::new();
        params.insert("dataInicio".to_string(), "2024-02-01".to_string());
        params.insert("dataFim".to_string(), "2024-01-01".to_string());

        let criteria = criteria_from_params(def, &params).unwrap();
        assert!(criteria.date_from.unwrap() > criteria.date_to.unwrap());
    }

    #[test]
    fn malformed_cod_maps_to_not_found() {
        assert!(matches!(parse_cod("123"), Err(ApiError::NotFound(_))));
        assert!(parse_cod("7e1b7c3e-9b4a-4f3e-8f25-1e9c7a2d4b6f").is_ok());
    }
}
