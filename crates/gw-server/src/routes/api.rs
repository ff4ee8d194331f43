//! Dashboard and intake endpoints

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use gw_storage::{BlockedBucket, TechniqueRollup, UsageBucket};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;
use utoipa::ToSchema;

use crate::middleware::error::{ApiErrorResponse, ApiResult};
use crate::routes::{KeyParams, LimitParams};
use crate::state::AppState;

/// Incident reported by an external feeder (e.g. a network IDS watcher)
#[derive(Debug, Deserialize, ToSchema)]
pub struct IncidentIntake {
    #[serde(default = "default_ip")]
    pub ip: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default = "default_rule")]
    pub rule: String,
}

fn default_ip() -> String {
    "unknown".to_string()
}

fn default_rule() -> String {
    "Unknown".to_string()
}

/// Blocked requests grouped into 5-minute buckets
#[utoipa::path(
    get,
    path = "/api/blocked-requests",
    tag = "dashboard",
    responses(
        (status = 200, description = "Blocked-count series")
    )
)]
pub async fn blocked_requests(State(state): State<AppState>) -> Json<Vec<BlockedBucket>> {
    match state.reader.blocked_buckets().await {
        Ok(buckets) => Json(buckets),
        Err(e) => {
            error!("Failed to fetch blocked-request buckets: {}", e);
            Json(Vec::new())
        }
    }
}

/// Request outcomes over the last hour in 5-minute buckets
#[utoipa::path(
    get,
    path = "/api/api-usage",
    tag = "dashboard",
    responses(
        (status = 200, description = "Usage series")
    )
)]
pub async fn api_usage(State(state): State<AppState>) -> Json<Vec<UsageBucket>> {
    match state.reader.api_usage().await {
        Ok(buckets) => Json(buckets),
        Err(e) => {
            error!("Failed to fetch API usage: {}", e);
            Json(Vec::new())
        }
    }
}

/// Incidents aggregated by rule with technique mapping attached
#[utoipa::path(
    get,
    path = "/api/ttps",
    tag = "dashboard",
    responses(
        (status = 200, description = "Technique roll-up, sorted by count"),
        (status = 500, description = "Aggregation failed")
    )
)]
pub async fn ttps(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<Vec<TechniqueRollup>>> {
    state
        .reader
        .technique_rollup(params.limit)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Could not fetch technique data: {}", e);
            ApiErrorResponse::internal_error(format!("Could not fetch technique data: {}", e))
        })
}

/// Latest alerts fed in by the external network sensor
#[utoipa::path(
    get,
    path = "/api/api-gateway",
    tag = "dashboard",
    responses(
        (status = 200, description = "Recent sensor alerts, newest first")
    )
)]
pub async fn gateway_alerts(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Json<Value> {
    match state.reader.recent_suricata_alerts(params.limit).await {
        Ok(alerts) => Json(json!({ "alerts": alerts })),
        Err(e) => {
            error!("Failed to fetch sensor alerts: {}", e);
            Json(json!({ "alerts": [] }))
        }
    }
}

/// Receive an incident from an external feeder. Requires the admin key.
#[utoipa::path(
    post,
    path = "/api/incidents",
    tag = "intake",
    request_body = IncidentIntake,
    responses(
        (status = 200, description = "Incident logged"),
        (status = 401, description = "Invalid or missing admin key"),
        (status = 500, description = "Persistence failed")
    )
)]
pub async fn add_incident(
    State(state): State<AppState>,
    Query(params): Query<KeyParams>,
    Json(body): Json<IncidentIntake>,
) -> ApiResult<Json<Value>> {
    if !state.verify_admin_key(params.key.as_deref()) {
        return Err(ApiErrorResponse::unauthorized("Unauthorized access."));
    }

    state
        .recorder
        .record_incident(&body.ip, &body.payload, &body.rule)
        .await
        .map_err(|e| {
            error!("Failed to log incident: {}", e);
            ApiErrorResponse::internal_error(format!("Failed to log incident: {}", e))
        })?;

    // Sensor-originated rules also land in the alert table so the
    // dashboard's gateway view sees them.
    if body.rule.starts_with("SURICATA") {
        if let Err(e) = state
            .recorder
            .record_suricata_alert(Utc::now(), &body.ip, &body.rule, "Suricata Alert", 2)
            .await
        {
            error!("Failed to log sensor alert: {}", e);
        }
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Incident logged successfully",
    })))
}
