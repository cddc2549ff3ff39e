//! Payment ledger model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::subscription::PaymentMethod;

/// Payment record status
///
/// Transitions are monotonic: PENDING moves to one of the terminal states,
/// terminal states never move again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Whether a row in `self` may be moved to `next`
    ///
    /// Re-applying the same status is allowed (no-op upsert); leaving a
    /// terminal state is not.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        *self == next || *self == Self::Pending
    }

    /// Map a gateway payment status string to a ledger status
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "approved" => Self::Completed,
            "rejected" => Self::Failed,
            "refunded" => Self::Refunded,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// One billing attempt for a subscription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub subscription_id: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    /// Cycle due date this payment settles (epoch millis)
    pub due_date: i64,
    /// Set iff COMPLETED (epoch millis)
    pub paid_at: Option<i64>,
    /// Gateway payment id; unique, webhook idempotency key
    pub external_id: Option<String>,
    /// Proof-of-payment reference (manual flow)
    pub proof_reference: Option<String>,
    pub created_at: i64,
}
