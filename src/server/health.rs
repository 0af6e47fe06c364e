//! Health check endpoint for liveness probes.

use axum::Json;
use serde_json::{Value, json};

/// Health check handler.
///
/// ```ignore
/// GET /api/v1/healthcheck HTTP/1.1
///
/// HTTP/1.1 200 OK
/// Content-Type: application/json
///
/// {"healthcheck": "ready"}
/// ```
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "healthcheck": "ready" }))
}
