//! Shared types for the billing platform
//!
//! Error codes, API response envelopes and billing domain types used by the
//! billing service and the operator console.

pub mod billing;
pub mod error;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
