//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::TenantNotFound
            | Self::PlanNotFound
            | Self::SubscriptionNotFound
            | Self::PaymentNotFound
            | Self::GatewayResourceNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict (wrong state for the requested transition)
            Self::PaymentNotPending
            | Self::SubscriptionCancelled
            | Self::AlreadyAutomated => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,

            // 422 Unprocessable (unrecoverable data problem)
            Self::PlanNotAssigned | Self::NoExternalSubscription => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 502 Bad Gateway
            Self::GatewayRejected => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::GatewayUnavailable | Self::NetworkError | Self::TimeoutError => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::ConfigError | Self::Unknown => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
