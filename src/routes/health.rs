use axum::Json;
use serde_json::{json, Value};

/// Static liveness answer; needs no token and touches no store.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Nexus CRM API is running",
    }))
}
