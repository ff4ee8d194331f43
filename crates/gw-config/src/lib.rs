//! Gateway configuration
//!
//! All settings are read from the environment exactly once at process start
//! and are immutable afterwards; the resulting struct is shared by `Arc`.

use std::path::PathBuf;
use std::time::Duration;

use gw_types::{AppError, AppResult};
use tracing::warn;

/// Database path. The process refuses to start without it.
pub const ENV_DB: &str = "GATEWARDEN_DB";
/// Shared admin key for the intake and admin endpoints.
pub const ENV_ADMIN_KEY: &str = "GATEWARDEN_ADMIN_KEY";
/// Endpoint of the payload-analysis service. Optional; without it the
/// semantic stage is never attempted.
pub const ENV_ANALYSIS_URL: &str = "GATEWARDEN_ANALYSIS_URL";
/// When set to `1`/`true`, an unreachable analysis service lets requests
/// through instead of blocking them.
pub const ENV_FAIL_OPEN: &str = "GATEWARDEN_FAIL_OPEN";
/// Timeout for a single analysis call, in seconds.
pub const ENV_ANALYSIS_TIMEOUT_SECS: &str = "GATEWARDEN_ANALYSIS_TIMEOUT_SECS";
pub const ENV_HOST: &str = "GATEWARDEN_HOST";
pub const ENV_PORT: &str = "GATEWARDEN_PORT";

const DEFAULT_ADMIN_KEY: &str = "supersecretadminkey";
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 5;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

/// Immutable gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// SQLite database path
    pub db_path: PathBuf,
    /// Admin key guarding the intake and admin endpoints
    pub admin_key: String,
    /// Analysis service endpoint; `None` disables the semantic stage
    pub analysis_url: Option<String>,
    /// Allow requests through when the analysis service is unreachable
    pub fail_open: bool,
    /// Per-call timeout for the analysis service
    pub analysis_timeout: Duration,
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl GatewayConfig {
    /// Load configuration from the environment.
    ///
    /// A missing database path is fatal; everything else falls back to a
    /// default or degrades a feature.
    pub fn from_env() -> AppResult<Self> {
        let db_path = std::env::var(ENV_DB)
            .map(PathBuf::from)
            .map_err(|_| AppError::Config(format!("{} is not set", ENV_DB)))?;

        let admin_key = match std::env::var(ENV_ADMIN_KEY) {
            Ok(key) if !key.is_empty() => key,
            _ => {
                warn!(
                    "{} is not set; using the built-in default admin key",
                    ENV_ADMIN_KEY
                );
                DEFAULT_ADMIN_KEY.to_string()
            }
        };

        let analysis_url = std::env::var(ENV_ANALYSIS_URL)
            .ok()
            .filter(|url| !url.is_empty());
        if analysis_url.is_none() {
            warn!(
                "{} is not set; payload analysis is disabled and inspection \
                 falls back to the rule sets alone",
                ENV_ANALYSIS_URL
            );
        }

        let fail_open = std::env::var(ENV_FAIL_OPEN)
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
            .unwrap_or(false);

        let analysis_timeout = std::env::var(ENV_ANALYSIS_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS));

        let host = std::env::var(ENV_HOST).unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = std::env::var(ENV_PORT)
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            db_path,
            admin_key,
            analysis_url,
            fail_open,
            analysis_timeout,
            host,
            port,
        })
    }
}
