//! Gatewarden web server
//!
//! Every inbound request passes the inspection middleware before reaching a
//! handler; the dashboard, intake, and admin endpoints under `/api/`,
//! `/admin`, `/health`, and `/openapi.json` are the gateway's own control
//! plane and bypass inspection. Everything else is screened and, when
//! allowed, answered by the catch-all.

pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;


use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::{Extension, Router};
use gw_types::AppResult;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::state::AppState;

/// Build the axum app with all routes and middleware
pub fn build_app(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(routes::system::health))
        .route("/openapi.json", get(openapi::serve_openapi_json))
        .route("/api/blocked-requests", get(routes::api::blocked_requests))
        .route("/api/api-usage", get(routes::api::api_usage))
        .route("/api/ttps", get(routes::api::ttps))
        .route("/api/api-gateway", get(routes::api::gateway_alerts))
        .route("/api/incidents", post(routes::api::add_incident))
        .route("/admin/incidents", get(routes::admin::list_incidents))
        .route(
            "/admin/incidents/{id}/handled",
            post(routes::admin::mark_incident_handled),
        )
        .fallback(routes::system::catch_all)
        .layer(axum::middleware::from_fn(
            middleware::inspect::payload_inspection_middleware,
        ))
        .layer(Extension(state.clone()))
        .with_state(state);

    // The dashboard is served from another origin; keep CORS permissive.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors)
}

/// Bind and serve until the process exits.
///
/// Uses connect-info so the inspection middleware can attribute a source
/// address to every verdict.
pub async fn start_server(state: AppState) -> AppResult<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gateway listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
