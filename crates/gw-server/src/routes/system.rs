//! Liveness and fallback handlers

use axum::http::Uri;
use axum::Json;
use serde_json::{json, Value};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is alive")
    )
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "gatewarden" }))
}

/// Catch-all for inspected traffic.
///
/// Any path with no dedicated route lands here after passing inspection,
/// so allowed requests always get an acknowledgement naming the path they
/// asked for.
pub async fn catch_all(uri: Uri) -> Json<Value> {
    Json(json!({
        "message": "Request processed successfully.",
        "path": uri.path(),
    }))
}
