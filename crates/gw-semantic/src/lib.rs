//! Similarity-analysis service client
//!
//! Adapter for the external service that embeds a payload and compares it
//! against known attack patterns. The pipeline only sees the
//! [`SemanticAnalyzer`] trait and the three-way [`AnalysisVerdict`]; what to
//! do about an unreachable service is pipeline policy, not client policy,
//! so the client never retries.

use std::time::Duration;

use async_trait::async_trait;
use gw_types::{AppError, AppResult};
use serde::Deserialize;
use tracing::{debug, warn};

/// Outcome of a single analysis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisVerdict {
    /// The service found nothing similar to a known attack
    Benign { reason: String },
    /// The payload resembles a known attack pattern
    Malicious {
        detected_pattern: String,
        reason: String,
    },
    /// Transport failure, non-2xx status, timeout, or malformed response.
    /// Deliberately distinct from `Benign`: the pipeline decides whether
    /// this blocks or passes.
    Unreachable,
}

/// Seam between the pipeline and the analysis service
#[async_trait]
pub trait SemanticAnalyzer: Send + Sync {
    async fn analyze(&self, payload: &str) -> AnalysisVerdict;
}

/// Wire format of the service response
#[derive(Debug, Deserialize)]
struct WireVerdict {
    verdict: String,
    detected_pattern: Option<String>,
    reason: Option<String>,
}

/// HTTP client for the analysis service
pub struct HttpAnalyzer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyzer {
    /// Build a client with a per-call timeout. Connections are pooled and
    /// reused across requests.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Analysis(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SemanticAnalyzer for HttpAnalyzer {
    async fn analyze(&self, payload: &str) -> AnalysisVerdict {
        let response = match self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "payload": payload }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Could not reach analysis service at {}: {}", self.endpoint, e);
                return AnalysisVerdict::Unreachable;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Analysis service returned status {} for {}",
                response.status(),
                self.endpoint
            );
            return AnalysisVerdict::Unreachable;
        }

        let wire: WireVerdict = match response.json().await {
            Ok(wire) => wire,
            Err(e) => {
                warn!("Malformed analysis response: {}", e);
                return AnalysisVerdict::Unreachable;
            }
        };

        match wire.verdict.as_str() {
            "malicious" => AnalysisVerdict::Malicious {
                detected_pattern: wire
                    .detected_pattern
                    .unwrap_or_else(|| "Unknown Pattern".to_string()),
                reason: wire.reason.unwrap_or_default(),
            },
            "benign" => {
                debug!("Analysis verdict: benign");
                AnalysisVerdict::Benign {
                    reason: wire.reason.unwrap_or_default(),
                }
            }
            other => {
                warn!("Analysis service returned unknown verdict '{}'", other);
                AnalysisVerdict::Unreachable
            }
        }
    }
}
