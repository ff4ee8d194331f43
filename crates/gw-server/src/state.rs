//! Server state management
//!
//! Shared state for the web server: the inspection pipeline, the recorder
//! and reader over the store, and the immutable configuration.

use std::sync::Arc;

use gw_config::GatewayConfig;
use gw_pipeline::InspectionPipeline;
use gw_storage::{GatewayDb, Reader, Recorder};
use subtle::ConstantTimeEq;

/// Server state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// The detector chain producing per-request verdicts
    pub pipeline: Arc<InspectionPipeline>,

    /// Write side of the store
    pub recorder: Recorder,

    /// Read side of the store, for the dashboard endpoints
    pub reader: Reader,

    /// Immutable configuration loaded at startup
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    pub fn new(pipeline: Arc<InspectionPipeline>, db: GatewayDb, config: GatewayConfig) -> Self {
        Self {
            pipeline,
            recorder: Recorder::new(db.clone()),
            reader: Reader::new(db),
            config: Arc::new(config),
        }
    }

    /// Constant-time comparison of a caller-supplied admin key.
    pub fn verify_admin_key(&self, provided: Option<&str>) -> bool {
        match provided {
            Some(key) => key
                .as_bytes()
                .ct_eq(self.config.admin_key.as_bytes())
                .into(),
            None => false,
        }
    }
}
