//! Unified error codes for the billing platform
//!
//! This module defines all error codes shared by the billing service and its
//! operator console. Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 3xxx: Tenant and plan errors
//! - 4xxx: Subscription errors
//! - 5xxx: Payment errors
//! - 6xxx: Payment gateway errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,

    // ==================== 3xxx: Tenant ====================
    /// Tenant not found
    TenantNotFound = 3002,
    /// Tenant has no plan assigned
    PlanNotAssigned = 3010,
    /// Plan not found
    PlanNotFound = 3011,

    // ==================== 4xxx: Subscription ====================
    /// Subscription not found
    SubscriptionNotFound = 4001,
    /// Subscription has been cancelled
    SubscriptionCancelled = 4002,
    /// Subscription is already automated and active
    AlreadyAutomated = 4003,
    /// Subscription has no gateway resource
    NoExternalSubscription = 4004,

    // ==================== 5xxx: Payment ====================
    /// Payment not found
    PaymentNotFound = 5001,
    /// Payment is not pending
    PaymentNotPending = 5002,

    // ==================== 6xxx: Gateway ====================
    /// Payment gateway unreachable or timed out
    GatewayUnavailable = 6001,
    /// Payment gateway rejected the request
    GatewayRejected = 6002,
    /// Payment gateway has no such resource
    GatewayResourceNotFound = 6003,
    /// Webhook signature did not verify
    WebhookSignatureInvalid = 6101,
    /// Webhook payload is malformed
    WebhookPayloadInvalid = 6102,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this code represents success
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "Caller is not authenticated",

            // Tenant
            ErrorCode::TenantNotFound => "Tenant not found",
            ErrorCode::PlanNotAssigned => "Tenant has no plan assigned",
            ErrorCode::PlanNotFound => "Plan not found",

            // Subscription
            ErrorCode::SubscriptionNotFound => "Subscription not found",
            ErrorCode::SubscriptionCancelled => "Subscription has been cancelled",
            ErrorCode::AlreadyAutomated => "Subscription is already automated and active",
            ErrorCode::NoExternalSubscription => "Subscription has no gateway agreement",

            // Payment
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::PaymentNotPending => "Payment is not pending",

            // Gateway
            ErrorCode::GatewayUnavailable => "Payment gateway is unavailable, try again later",
            ErrorCode::GatewayRejected => "Payment gateway rejected the request",
            ErrorCode::GatewayResourceNotFound => "Payment gateway resource not found",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature is invalid",
            ErrorCode::WebhookPayloadInvalid => "Webhook payload is invalid",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),

            // Tenant
            3002 => Ok(ErrorCode::TenantNotFound),
            3010 => Ok(ErrorCode::PlanNotAssigned),
            3011 => Ok(ErrorCode::PlanNotFound),

            // Subscription
            4001 => Ok(ErrorCode::SubscriptionNotFound),
            4002 => Ok(ErrorCode::SubscriptionCancelled),
            4003 => Ok(ErrorCode::AlreadyAutomated),
            4004 => Ok(ErrorCode::NoExternalSubscription),

            // Payment
            5001 => Ok(ErrorCode::PaymentNotFound),
            5002 => Ok(ErrorCode::PaymentNotPending),

            // Gateway
            6001 => Ok(ErrorCode::GatewayUnavailable),
            6002 => Ok(ErrorCode::GatewayRejected),
            6003 => Ok(ErrorCode::GatewayResourceNotFound),
            6101 => Ok(ErrorCode::WebhookSignatureInvalid),
            6102 => Ok(ErrorCode::WebhookPayloadInvalid),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
