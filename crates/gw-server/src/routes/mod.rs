//! HTTP route handlers

pub mod admin;
pub mod api;
pub mod system;

use serde::Deserialize;

/// `?key=` query parameter for endpoints guarded by the admin key
#[derive(Debug, Deserialize)]
pub struct KeyParams {
    pub key: Option<String>,
}

/// `?limit=` query parameter for capped listings
#[derive(Debug, Deserialize)]
pub struct LimitParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}
