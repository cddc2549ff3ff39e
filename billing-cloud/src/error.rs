//! Unified service-layer error type for billing-cloud
//!
//! `ServiceError` bridges the gap between infrastructure errors (`sqlx::Error`,
//! `BoxError`, gateway failures) and the API-layer error (`AppError`). It enables
//! `?` propagation without manual `.map_err(...)` boilerplate.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::gateway::GatewayError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Db`: Database/infrastructure errors (auto-logged, mapped to InternalError)
/// - `App`: Business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error (sqlx, serde, etc.)
    Db(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl ServiceError {
    /// Message safe to show an operator
    pub fn operator_message(&self) -> String {
        match self {
            ServiceError::App(e) => e.message.clone(),
            ServiceError::Db(_) => ErrorCode::InternalError.message().to_string(),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Db(e) => write!(f, "infrastructure error: {e}"),
            ServiceError::App(e) => write!(f, "{} ({})", e.message, e.code),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<GatewayError> for ServiceError {
    fn from(e: GatewayError) -> Self {
        ServiceError::App(e.into())
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
