//! Gatewarden process entry point
//!
//! Wires configuration, storage, the detector chain, and the HTTP server
//! together. Startup is the only place a failure is fatal: a missing
//! database path or a database that stays unreachable after the bounded
//! retry aborts the process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use gw_config::GatewayConfig;
use gw_pipeline::InspectionPipeline;
use gw_rules::{RegexRuleSet, SignatureRuleSet};
use gw_semantic::{HttpAnalyzer, SemanticAnalyzer};
use gw_server::state::AppState;
use gw_storage::GatewayDb;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DB_CONNECT_ATTEMPTS: u32 = 5;
const DB_CONNECT_BACKOFF: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env().context("Invalid configuration")?;

    let db = GatewayDb::open_with_retry(&config.db_path, DB_CONNECT_ATTEMPTS, DB_CONNECT_BACKOFF)
        .await
        .context("Database is unreachable")?;

    let analyzer: Option<Arc<dyn SemanticAnalyzer>> = match &config.analysis_url {
        Some(url) => {
            info!("Payload analysis service configured at {}", url);
            Some(Arc::new(HttpAnalyzer::new(
                url.clone(),
                config.analysis_timeout,
            )?))
        }
        None => None,
    };

    let signatures = SignatureRuleSet::builtin();
    let regexes = RegexRuleSet::builtin();
    info!(
        "Inspection pipeline ready: {} signature rules, {} regex rules, analysis {}",
        signatures.len(),
        regexes.len(),
        if analyzer.is_some() { "enabled" } else { "disabled" },
    );

    let pipeline = InspectionPipeline::new(signatures, regexes, analyzer, config.fail_open);
    let state = AppState::new(Arc::new(pipeline), db, config);

    gw_server::start_server(state).await?;
    Ok(())
}
