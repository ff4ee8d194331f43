//! Admin endpoints, all guarded by the admin key

use axum::extract::{Path, Query, State};
use axum::Json;
use gw_storage::IncidentRow;
use serde_json::{json, Value};
use tracing::error;

use crate::middleware::error::{ApiErrorResponse, ApiResult};
use crate::routes::KeyParams;
use crate::state::AppState;

/// Raw incident listing, newest first
#[utoipa::path(
    get,
    path = "/admin/incidents",
    tag = "admin",
    responses(
        (status = 200, description = "Most recent incidents"),
        (status = 401, description = "Invalid or missing admin key")
    )
)]
pub async fn list_incidents(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
) -> ApiResult<Json<Vec<IncidentRow>>> {
    if !state.verify_admin_key(params.key.as_deref()) {
        return Err(ApiErrorResponse::unauthorized("Unauthorized access."));
    }

    state.reader.recent_incidents().await.map(Json).map_err(|e| {
        error!("Failed to fetch incidents: {}", e);
        ApiErrorResponse::internal_error(format!("Failed to fetch incidents: {}", e))
    })
}

/// Mark an incident as handled
#[utoipa::path(
    post,
    path = "/admin/incidents/{id}/handled",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Incident identifier")
    ),
    responses(
        (status = 200, description = "Incident marked as handled"),
        (status = 401, description = "Invalid or missing admin key"),
        (status = 404, description = "No such incident")
    )
)]
pub async fn mark_incident_handled(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<KeyParams>,
) -> ApiResult<Json<Value>> {
    if !state.verify_admin_key(params.key.as_deref()) {
        return Err(ApiErrorResponse::unauthorized("Unauthorized access."));
    }

    let updated = state.recorder.mark_handled(id).await.map_err(|e| {
        error!("Failed to mark incident {} handled: {}", id, e);
        ApiErrorResponse::internal_error(format!("Failed to mark incident handled: {}", e))
    })?;

    if updated {
        Ok(Json(json!({
            "status": "success",
            "message": format!("Incident {} marked as handled", id),
        })))
    } else {
        Err(ApiErrorResponse::not_found(format!(
            "No incident with id {}",
            id
        )))
    }
}
