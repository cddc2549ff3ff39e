//! Tenant and Plan models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Billed customer of the platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Tenant {
    pub id: String,
    pub subdomain: String,
    /// Serving flag; only grace expiry (or an admin) turns it off
    pub is_active: bool,
    pub email: String,
}

/// Priced offering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    /// Billing cycle in months (1 = monthly, 12 = annual)
    pub billing_cycle: i32,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub features: PlanFeatures,
}

/// Closed set of plan limits and flags.
///
/// Unknown keys are rejected at deserialization time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PlanFeatures {
    /// Maximum number of content pages (None = unlimited)
    pub max_pages: Option<u32>,
    /// Storage quota in MB (None = unlimited)
    pub max_storage_mb: Option<u32>,
    pub custom_domain: bool,
    pub dicom_viewer: bool,
    pub priority_support: bool,
}

impl Plan {
    /// Validate plan invariants before the plan is persisted
    pub fn validate(&self) -> Result<(), AppError> {
        if self.price <= Decimal::ZERO {
            return Err(AppError::validation("Plan price must be positive")
                .with_detail("plan", self.id.clone()));
        }
        if !(1..=120).contains(&self.billing_cycle) {
            return Err(
                AppError::validation("Billing cycle must be between 1 and 120 months")
                    .with_detail("plan", self.id.clone()),
            );
        }
        Ok(())
    }

    /// Billing cycle as an unsigned month count
    pub fn cycle_months(&self) -> u32 {
        self.billing_cycle.max(1) as u32
    }
}
