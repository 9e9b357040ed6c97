use axum::response::Json;
use serde_json::{json, Value};

use crate::middleware::AuthUser;

/// GET /api/auth/whoami - Echo the identity established by the auth gate
///
/// Claims are read from the request context, not re-verified; the gate has
/// already done that.
pub async fn whoami(user: AuthUser) -> Json<Value> {
    Json(json!({
        "cod": user.cod,
        "email": user.email,
        "role": user.role,
        "photo": user.photo,
        "company": user.company,
        "function": user.function,
    }))
}
