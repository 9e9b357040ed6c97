//! Dynamic query layer for the opaque entity tables.
//!
//! Every opaque entity lives in a table shaped (cod uuid, data jsonb,
//! created_at timestamptz). Records travel wholesale: create and update move
//! entire JSON bodies, list filters project into the jsonb column. Table and
//! column names only ever come from the static `EntityDef` registry, so the
//! interpolated identifiers are not attacker-controlled.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, PgPool, Row};
use uuid::Uuid;

use crate::database::manager::{classify, DatabaseError};
use crate::entities::{DateSource, EntityDef, ListOrder};

/// SELECT expression assembling the API-facing record: the stored body plus
/// the row identity and creation timestamp. Built last so cod wins over any
/// stray body field of the same name.
const RECORD_EXPR: &str = "data || jsonb_build_object('cod', cod, 'createdAt', created_at)";

/// Bind parameter for dynamically-built SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// Filter criteria accepted by list/count, already validated by the handler
/// against the entity's declared filter fields.
#[derive(Debug, Default)]
pub struct ListCriteria {
    pub contains: Vec<(&'static str, String)>,
    pub equals: Vec<(&'static str, String)>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Parse a date filter parameter. Accepts RFC 3339 timestamps or plain
/// `YYYY-MM-DD` dates (interpreted as midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn date_expr(def: &EntityDef) -> Option<String> {
    match def.date_filter {
        Some(DateSource::CreatedAt) => Some("created_at".to_string()),
        Some(DateSource::Field(field)) => Some(format!("(data->>'{}')::timestamptz", field)),
        None => None,
    }
}

/// Build the WHERE clauses and bind parameters for a list/count query.
fn build_where(def: &EntityDef, criteria: &ListCriteria) -> (Vec<String>, Vec<Param>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    for (field, value) in &criteria.contains {
        params.push(Param::Text(format!("%{}%", value)));
        clauses.push(format!("data->>'{}' ILIKE ${}", field, params.len()));
    }
    for (field, value) in &criteria.equals {
        params.push(Param::Text(value.clone()));
        clauses.push(format!("data->>'{}' = ${}", field, params.len()));
    }

    if let Some(expr) = date_expr(def) {
        if let Some(from) = criteria.date_from {
            params.push(Param::Timestamp(from));
            clauses.push(format!("{} >= ${}", expr, params.len()));
        }
        if let Some(to) = criteria.date_to {
            params.push(Param::Timestamp(to));
            clauses.push(format!("{} <= ${}", expr, params.len()));
        }
    }

    (clauses, params)
}

fn build_order(def: &EntityDef) -> String {
    match def.order {
        ListOrder::Unordered => String::new(),
        ListOrder::RecencyDesc => "ORDER BY created_at DESC".to_string(),
        ListOrder::DateAsc => match date_expr(def) {
            Some(expr) => format!("ORDER BY {} ASC", expr),
            None => String::new(),
        },
    }
}

/// Build the full list query for an entity, selecting the given expression.
fn build_list_sql(def: &EntityDef, criteria: &ListCriteria, select: &str) -> (String, Vec<Param>) {
    let (clauses, params) = build_where(def, criteria);

    let mut sql = format!("SELECT {} AS record FROM \"{}\"", select, def.table);
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    let order = build_order(def);
    if !order.is_empty() {
        sql.push(' ');
        sql.push_str(&order);
    }
    if let Some(limit) = criteria.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = criteria.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    (sql, params)
}

fn build_count_sql(def: &EntityDef, criteria: &ListCriteria) -> (String, Vec<Param>) {
    let (clauses, params) = build_where(def, criteria);
    let mut sql = format!("SELECT COUNT(*) AS count FROM \"{}\"", def.table);
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    (sql, params)
}

fn bind_params<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    params: &'q [Param],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for p in params {
        q = match p {
            Param::Text(s) => q.bind(s),
            Param::Timestamp(t) => q.bind(t),
        };
    }
    q
}

/// Insert a new record, generating its code server-side.
pub async fn insert(
    pool: &PgPool,
    def: &EntityDef,
    body: Map<String, Value>,
) -> Result<Value, DatabaseError> {
    let sql = format!(
        "INSERT INTO \"{}\" (cod, data) VALUES ($1, $2) RETURNING {} AS record",
        def.table, RECORD_EXPR
    );

    let row = sqlx::query(&sql)
        .bind(Uuid::new_v4())
        .bind(Value::Object(body))
        .fetch_one(pool)
        .await
        .map_err(classify)?;

    Ok(row.try_get("record")?)
}

/// Fetch one record by code.
pub async fn fetch(
    pool: &PgPool,
    def: &EntityDef,
    cod: Uuid,
) -> Result<Option<Value>, DatabaseError> {
    let sql = format!(
        "SELECT {} AS record FROM \"{}\" WHERE cod = $1",
        RECORD_EXPR, def.table
    );

    let row = sqlx::query(&sql).bind(cod).fetch_optional(pool).await?;
    row.map(|r| r.try_get("record")).transpose().map_err(Into::into)
}

/// Merge the supplied fields into the record identified by code. Returns
/// None when no such record exists.
pub async fn update(
    pool: &PgPool,
    def: &EntityDef,
    cod: Uuid,
    body: Map<String, Value>,
) -> Result<Option<Value>, DatabaseError> {
    let sql = format!(
        "UPDATE \"{}\" SET data = data || $2 WHERE cod = $1 RETURNING {} AS record",
        def.table, RECORD_EXPR
    );

    let row = sqlx::query(&sql)
        .bind(cod)
        .bind(Value::Object(body))
        .fetch_optional(pool)
        .await
        .map_err(classify)?;

    row.map(|r| r.try_get("record")).transpose().map_err(Into::into)
}

/// Delete a record by code, echoing the removed record. Returns None when
/// the code does not exist (already-deleted deletes map to 404, not 500).
pub async fn remove(
    pool: &PgPool,
    def: &EntityDef,
    cod: Uuid,
) -> Result<Option<Value>, DatabaseError> {
    let sql = format!(
        "DELETE FROM \"{}\" WHERE cod = $1 RETURNING {} AS record",
        def.table, RECORD_EXPR
    );

    let row = sqlx::query(&sql).bind(cod).fetch_optional(pool).await?;
    row.map(|r| r.try_get("record")).transpose().map_err(Into::into)
}

/// List records matching the criteria, full record bodies.
pub async fn list(
    pool: &PgPool,
    def: &EntityDef,
    criteria: &ListCriteria,
) -> Result<Vec<Value>, DatabaseError> {
    let (sql, params) = build_list_sql(def, criteria, RECORD_EXPR);

    let rows = bind_params(sqlx::query(&sql), &params)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|r| r.try_get("record").map_err(Into::into))
        .collect()
}

/// Count records matching the criteria (for pagination envelopes).
pub async fn count(
    pool: &PgPool,
    def: &EntityDef,
    criteria: &ListCriteria,
) -> Result<i64, DatabaseError> {
    let (sql, params) = build_count_sql(def, criteria);

    let row = bind_params(sqlx::query(&sql), &params)
        .fetch_one(pool)
        .await?;

    Ok(row.try_get("count")?)
}

/// List code+name projections for the public reference routes.
pub async fn list_reference(
    pool: &PgPool,
    def: &EntityDef,
    criteria: &ListCriteria,
) -> Result<Vec<Value>, DatabaseError> {
    let select = "jsonb_build_object('cod', cod, 'name', data->>'name')";
    let (sql, params) = build_list_sql(def, criteria, select);

    let rows = bind_params(sqlx::query(&sql), &params)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|r| r.try_get("record").map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::lookup;
    use chrono::TimeZone;

    #[test]
    fn parses_plain_dates_and_rfc3339() {
        let midnight = parse_date("2024-03-15").unwrap();
        assert_eq!(midnight, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());

        let stamped = parse_date("2024-03-15T10:30:00Z").unwrap();
        assert_eq!(stamped, Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap());

        assert!(parse_date("15/03/2024").is_none());
        assert!(parse_date("not-a-date").is_none());
    }

    #[test]
    fn substring_filters_use_case_insensitive_like() {
        let def = lookup("schedules").unwrap();
        let criteria = ListCriteria {
            contains: vec![("status", "open".to_string())],
            ..Default::default()
        };

        let (clauses, params) = build_where(def, &criteria);
        assert_eq!(clauses, vec!["data->>'status' ILIKE $1"]);
        assert_eq!(params, vec![Param::Text("%open%".to_string())]);
    }

    #[test]
    fn date_range_is_inclusive_on_both_bounds() {
        let def = lookup("schedules").unwrap();
        let criteria = ListCriteria {
            date_from: parse_date("2024-01-01"),
            date_to: parse_date("2024-01-31"),
            ..Default::default()
        };

        let (clauses, _) = build_where(def, &criteria);
        assert_eq!(
            clauses,
            vec![
                "(data->>'date')::timestamptz >= $1",
                "(data->>'date')::timestamptz <= $2"
            ]
        );
    }

    #[test]
    fn tickets_filter_on_creation_timestamp_and_order_by_recency() {
        let def = lookup("tickets").unwrap();
        let criteria = ListCriteria {
            equals: vec![("status", "open".to_string())],
            date_from: parse_date("2024-01-01"),
            ..Default::default()
        };

        let (sql, params) = build_list_sql(def, &criteria, RECORD_EXPR);
        assert!(sql.contains("FROM \"tickets\""));
        assert!(sql.contains("data->>'status' = $1"));
        assert!(sql.contains("created_at >= $2"));
        assert!(sql.ends_with("ORDER BY created_at DESC"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn schedules_order_ascending_by_their_date_field() {
        let def = lookup("schedules").unwrap();
        let (sql, _) = build_list_sql(def, &ListCriteria::default(), RECORD_EXPR);
        assert!(sql.ends_with("ORDER BY (data->>'date')::timestamptz ASC"));
    }

    #[test]
    fn pagination_appends_limit_and_offset() {
        let def = lookup("contracts").unwrap();
        let criteria = ListCriteria {
            limit: Some(10),
            offset: Some(10),
            ..Default::default()
        };

        let (sql, _) = build_list_sql(def, &criteria, RECORD_EXPR);
        assert!(sql.ends_with("LIMIT 10 OFFSET 10"));
    }

    #[test]
    fn count_shares_the_where_clause() {
        let def = lookup("attachments").unwrap();
        let criteria = ListCriteria {
            equals: vec![("ticketCode", "abc".to_string())],
            limit: Some(10),
            offset: Some(0),
            ..Default::default()
        };

        let (sql, params) = build_count_sql(def, &criteria);
        assert_eq!(
            sql,
            "SELECT COUNT(*) AS count FROM \"attachments\" WHERE data->>'ticketCode' = $1"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn entities_without_a_date_field_ignore_range_bounds() {
        let def = lookup("faqs").unwrap();
        let criteria = ListCriteria {
            date_from: parse_date("2024-01-01"),
            date_to: parse_date("2024-01-31"),
            ..Default::default()
        };

        let (clauses, params) = build_where(def, &criteria);
        assert!(clauses.is_empty());
        assert!(params.is_empty());
    }
}
