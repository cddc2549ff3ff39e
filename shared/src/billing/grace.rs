//! Grace period calculator
//!
//! Grace status is recomputed on every read from `grace_started_at` and
//! `grace_period_days`. Nothing about expiry is persisted.

use serde::{Deserialize, Serialize};

use crate::util::DAY_MS;

/// Derived grace-period state of a subscription
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraceStatus {
    pub is_active: bool,
    pub is_expired: bool,
    pub days_remaining: i64,
    pub started_at: Option<i64>,
    pub ends_at: Option<i64>,
}

/// Compute grace status at `now` (all timestamps epoch millis).
///
/// `days_remaining = ceil((ends_at - now) / 1 day)`; zero or less is expired.
pub fn grace_period_status(
    grace_started_at: Option<i64>,
    grace_period_days: i32,
    now: i64,
) -> GraceStatus {
    let Some(started_at) = grace_started_at else {
        return GraceStatus::default();
    };

    let ends_at = started_at.saturating_add(i64::from(grace_period_days).saturating_mul(DAY_MS));
    let days_remaining = ceil_div(ends_at.saturating_sub(now), DAY_MS);
    let is_active = days_remaining > 0;

    GraceStatus {
        is_active,
        is_expired: !is_active,
        days_remaining,
        started_at: Some(started_at),
        ends_at: Some(ends_at),
    }
}

/// Signed ceiling division for positive `d`
fn ceil_div(n: i64, d: i64) -> i64 {
    let q = n / d;
    if n % d > 0 { q + 1 } else { q }
}
