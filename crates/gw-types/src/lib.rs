//! Shared types for the Gatewarden workspace

mod errors;

pub use errors::{AppError, AppResult};
