//! Payment gateway contract
//!
//! The gateway owns recurring-payment agreements ("preapprovals") and one-off
//! payment resources. Everything in the billing core talks to it through
//! [`PaymentGateway`] so tests can swap in a recording mock.

pub mod client;
pub mod signature;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::AppError;

pub use client::HttpGateway;

/// Gateway status of an authorized recurring agreement
pub const STATUS_AUTHORIZED: &str = "authorized";

/// Request to create a recurring-payment agreement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRecurring {
    pub reason: String,
    /// Our subscription id, echoed back by the gateway
    pub external_reference: String,
    pub payer_email: String,
    pub amount: Decimal,
    pub frequency_months: u32,
    pub currency: String,
}

/// Gateway view of a recurring-payment agreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub id: String,
    pub status: String,
    /// Next charge date reported by the gateway (epoch millis)
    pub next_payment_date: Option<i64>,
    /// Hosted authorization page
    pub init_point: Option<String>,
}

impl RecurringPayment {
    pub fn is_authorized(&self) -> bool {
        self.status == STATUS_AUTHORIZED
    }
}

/// Gateway view of a single payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    pub amount: Decimal,
    /// Recurring agreement this payment was charged under
    pub related_recurring_id: Option<String>,
}

/// Gateway call failure
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request timed out")]
    Timeout,
    #[error("gateway resource not found: {0}")]
    NotFound(String),
    #[error("gateway returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("gateway transport error: {0}")]
    Transport(String),
    #[error("gateway response could not be decoded: {0}")]
    Decode(String),
}

impl GatewayError {
    /// External-unavailable failures; the same call may succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Timeout | GatewayError::Transport(_) => true,
            GatewayError::Http { status, .. } => *status >= 500 || *status == 429,
            GatewayError::NotFound(_) | GatewayError::Decode(_) => false,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::NotFound(_) => AppError::gateway_resource_not_found(e.to_string()),
            _ if e.is_retryable() => AppError::gateway_unavailable(e.to_string()),
            _ => AppError::gateway_rejected(e.to_string()),
        }
    }
}

/// Recurring-payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_recurring_payment(
        &self,
        req: &CreateRecurring,
    ) -> Result<RecurringPayment, GatewayError>;

    async fn get_recurring_payment(&self, id: &str) -> Result<RecurringPayment, GatewayError>;

    async fn update_recurring_payment_amount(
        &self,
        id: &str,
        amount: Decimal,
    ) -> Result<(), GatewayError>;

    async fn cancel_recurring_payment(&self, id: &str) -> Result<(), GatewayError>;

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayError>;

    /// Cheap authenticated request used by the health check
    async fn ping(&self) -> Result<(), GatewayError>;
}
