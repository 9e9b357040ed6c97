use axum::{
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};
use crate::middleware::auth_gate;

/// Build the full application router. Route-group membership, not path
/// prefix, decides whether the auth gate runs.
pub fn app() -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Public group: token acquisition and reference data
fn public_routes() -> Router {
    Router::new()
        .route("/auth/login", post(public::session::login))
        .route("/auth/register", post(public::register::register))
        .route("/companies", get(public::reference::companies))
        .route("/departments", get(public::reference::departments))
        .route("/roles", get(public::reference::roles))
}

/// Protected group: user management plus generic entity CRUD. The typed
/// /api/users routes are registered alongside the :entity captures; static
/// segments win, so "users" never reaches the generic handlers.
fn protected_routes() -> Router {
    Router::new()
        .route("/api/auth/whoami", get(protected::session::whoami))
        .route("/api/users", get(protected::users::list))
        .route("/api/users/types", get(protected::users::types))
        .route(
            "/api/users/:cod",
            put(protected::users::update).delete(protected::users::remove),
        )
        .route(
            "/api/:entity",
            get(protected::entities::list).post(protected::entities::create),
        )
        .route(
            "/api/:entity/:cod",
            get(protected::entities::get_one)
                .put(protected::entities::update)
                .delete(protected::entities::remove),
        )
        .layer(axum::middleware::from_fn(auth_gate))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok",
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string(),
            })),
        ),
    }
}
