//! Billing core
//!
//! Two entry points mutate subscription and payment state: the periodic
//! [`sweep`] and the gateway-driven [`reconcile`] paths. Operator actions
//! live in [`lifecycle`] and [`settlement`]. Every operation takes `now`
//! explicitly.

pub mod lifecycle;
pub mod reconcile;
pub mod settlement;
pub mod sweep;

#[cfg(test)]
pub mod testing;

use shared::billing::{Plan, Subscription};
use shared::error::{AppError, ErrorCode};
use shared::util::add_months;

use crate::db::AuditEntry;
use crate::error::ServiceResult;
use crate::state::AppState;

/// Due date after a confirmed payment: one cycle from `confirmed_at`,
/// never earlier than the current due date.
pub fn advance_next_payment(
    current: i64,
    confirmed_at: i64,
    cycle_months: u32,
) -> Result<i64, AppError> {
    let next = add_months(confirmed_at, cycle_months)
        .ok_or_else(|| AppError::internal("Next payment date out of range"))?;
    Ok(next.max(current))
}

/// Load the plan a subscription is billed on.
///
/// A plan with a non-positive price or an out-of-range cycle is never billed.
pub(crate) async fn plan_for(state: &AppState, sub: &Subscription) -> ServiceResult<Plan> {
    let plan_id = sub
        .plan_id
        .as_deref()
        .ok_or_else(|| AppError::plan_not_assigned(&sub.tenant_id))?;
    let plan = state.store.find_plan(plan_id).await?.ok_or_else(|| {
        AppError::new(ErrorCode::PlanNotFound).with_detail("plan", plan_id.to_string())
    })?;
    plan.validate()?;
    Ok(plan)
}

/// Append an audit row; failures are logged and swallowed
pub(crate) async fn audit(
    state: &AppState,
    tenant_id: &str,
    action: &str,
    detail: serde_json::Value,
    now: i64,
) {
    let entry = AuditEntry {
        tenant_id: tenant_id.to_string(),
        action: action.to_string(),
        detail: Some(detail),
        created_at: now,
    };
    if let Err(e) = state.store.append_audit(&entry).await {
        tracing::warn!(tenant_id = tenant_id, action = action, error = %e, "Failed to write audit log");
    }
}
