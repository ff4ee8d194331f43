//! OpenAPI specification

use axum::Json;
use utoipa::OpenApi;

use crate::routes;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatewarden",
        description = "Request-inspection gateway: payload screening, incident recording, and dashboard aggregations"
    ),
    paths(
        routes::system::health,
        routes::api::blocked_requests,
        routes::api::api_usage,
        routes::api::ttps,
        routes::api::gateway_alerts,
        routes::api::add_incident,
        routes::admin::list_incidents,
        routes::admin::mark_incident_handled,
    ),
    components(schemas(routes::api::IncidentIntake)),
    tags(
        (name = "system", description = "Liveness"),
        (name = "dashboard", description = "Aggregated read endpoints"),
        (name = "intake", description = "External incident intake"),
        (name = "admin", description = "Key-guarded admin surface")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI specification as JSON
pub async fn serve_openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
