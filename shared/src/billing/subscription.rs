//! Subscription model

use serde::{Deserialize, Serialize};

use super::grace::{GraceStatus, grace_period_status};

/// Stored subscription status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Paused,
    Cancelled,
}

impl SubscriptionStatus {
    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Pending => "PENDING",
            Self::Paused => "PAUSED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// How the tenant pays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum PaymentMethod {
    /// Confirmed out-of-band by an operator
    Manual,
    /// Charged by the gateway's recurring agreement
    Automated,
}

impl PaymentMethod {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Automated => "AUTOMATED",
        }
    }
}

/// Billing relationship between one tenant and one plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Subscription {
    pub id: String,
    pub tenant_id: String,
    pub plan_id: Option<String>,
    pub status: SubscriptionStatus,
    pub payment_method: PaymentMethod,
    /// Gateway recurring-payment id (AUTOMATED only)
    pub external_id: Option<String>,
    /// Next amount due (epoch millis)
    pub next_payment_at: i64,
    /// Set exactly while a missed payment is tolerated (epoch millis)
    pub grace_started_at: Option<i64>,
    pub grace_period_days: i32,
    /// Cached plan cycle length in months
    pub billing_cycle: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Subscription {
    /// Is the next payment strictly in the past?
    pub fn is_past_due(&self, now: i64) -> bool {
        self.next_payment_at < now
    }

    pub fn is_automated(&self) -> bool {
        self.payment_method == PaymentMethod::Automated
    }

    /// AUTOMATED and ACTIVE: nothing left to switch
    pub fn is_automated_and_active(&self) -> bool {
        self.is_automated() && self.status == SubscriptionStatus::Active
    }

    /// Billing cycle as an unsigned month count
    pub fn cycle_months(&self) -> u32 {
        self.billing_cycle.max(1) as u32
    }

    /// Grace status recomputed at `now`
    pub fn grace_status(&self, now: i64) -> GraceStatus {
        grace_period_status(self.grace_started_at, self.grace_period_days, now)
    }
}
