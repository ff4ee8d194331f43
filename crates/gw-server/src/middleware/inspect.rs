//! Payload inspection middleware
//!
//! Intercepts every inbound request, assembles the combined payload text
//! (body plus query string), and asks the pipeline for a verdict. Internal
//! endpoints — the dashboard API, the admin surface, health, and the
//! OpenAPI document — bypass inspection entirely; the gateway must not
//! inspect its own control-plane traffic, and that exclusion is part of
//! the contract.

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gw_pipeline::{DetectorKind, InspectionOutcome};
use serde_json::json;
use tracing::{error, warn};

use crate::middleware::error::ApiErrorResponse;
use crate::state::AppState;

/// Prefixes that never go through the pipeline
const BYPASS_PREFIXES: &[&str] = &["/api/", "/admin", "/health", "/openapi"];

/// Bodies are buffered up to this size for inspection; anything larger (or
/// unreadable) degrades to an empty payload text.
const MAX_INSPECTED_BODY_BYTES: usize = 1024 * 1024;

pub async fn payload_inspection_middleware(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if BYPASS_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return next.run(req).await;
    }

    let state = match req.extensions().get::<AppState>() {
        Some(state) => state.clone(),
        None => {
            return ApiErrorResponse::internal_error("Missing application state").into_response();
        }
    };

    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // Buffer the body so it can be both inspected and forwarded.
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_INSPECTED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => Bytes::new(),
    };

    let body_text = String::from_utf8_lossy(&bytes);
    let query = parts.uri.query().unwrap_or("");
    let payload = format!("{}{}", body_text, query);

    let req = Request::from_parts(parts, Body::from(bytes.clone()));

    match state.pipeline.inspect(&payload).await {
        InspectionOutcome::Blocked { detector, rules } => {
            warn!(
                "Blocked request from {} on {}: {}",
                client_ip,
                path,
                rules.join(", ")
            );

            // One pipeline decision, one incident per matched rule.
            for rule in &rules {
                if let Err(e) = state.recorder.record_incident(&client_ip, &payload, rule).await
                {
                    error!("Failed to log incident: {}", e);
                }
            }

            let detail = match detector {
                DetectorKind::Signature => {
                    format!("Blocked by signature rule: {}", rules.join(", "))
                }
                DetectorKind::Regex => {
                    format!("Blocked by regex rule(s): {}", rules.join(", "))
                }
                DetectorKind::Semantic => {
                    format!("Blocked by semantic analysis: {}", rules.join(", "))
                }
            };
            (StatusCode::FORBIDDEN, Json(json!({ "detail": detail }))).into_response()
        }
        InspectionOutcome::AnalysisUnavailable => {
            // Fail-closed without an attack on record: this is a service
            // outage, not an incident.
            ApiErrorResponse::service_unavailable(
                "Service Unavailable: Analysis service is down.",
            )
            .into_response()
        }
        InspectionOutcome::Allowed => {
            if let Err(e) = state.recorder.record_success(&client_ip).await {
                error!("Failed to log request: {}", e);
            }
            next.run(req).await
        }
    }
}
