//! Manual settlement: an operator confirms an out-of-band payment

use serde::Serialize;
use shared::billing::{Payment, PaymentStatus, Subscription};
use shared::error::AppError;

use super::{advance_next_payment, audit, plan_for};
use crate::db::audit::action;
use crate::email::{self, templates};
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub payment: Payment,
    pub subscription: Subscription,
    /// Confirmation email failure, surfaced for audit
    pub warning: Option<String>,
}

/// Mark a PENDING payment COMPLETED and advance the subscription one cycle
/// from `now`, atomically.
pub async fn mark_paid(state: &AppState, payment_id: &str, now: i64) -> ServiceResult<Settlement> {
    let mut tx = state.store.begin().await?;

    let mut payment = tx
        .lock_payment(payment_id)
        .await?
        .ok_or_else(|| AppError::payment_not_found(payment_id))?;
    if payment.status != PaymentStatus::Pending {
        return Err(AppError::payment_not_pending(payment_id, payment.status.as_db()).into());
    }

    let mut sub = tx
        .lock_subscription(&payment.subscription_id)
        .await?
        .ok_or_else(|| AppError::subscription_not_found(&payment.subscription_id))?;
    let plan = plan_for(state, &sub).await?;

    payment.status = PaymentStatus::Completed;
    payment.paid_at = Some(now);
    tx.update_payment_status(&payment.id, payment.status, payment.paid_at)
        .await?;

    sub.next_payment_at = advance_next_payment(sub.next_payment_at, now, plan.cycle_months())?;
    sub.grace_started_at = None;
    sub.updated_at = now;
    tx.update_subscription(&sub).await?;

    tx.commit().await?;

    tracing::info!(
        tenant_id = %sub.tenant_id,
        payment_id = %payment.id,
        next_payment_at = sub.next_payment_at,
        "Manual payment confirmed"
    );

    audit(
        state,
        &sub.tenant_id,
        action::PAYMENT_CONFIRMED,
        serde_json::json!({
            "payment_id": payment.id,
            "amount": payment.amount.to_string(),
            "next_payment_at": sub.next_payment_at,
        }),
        now,
    )
    .await;

    let warning = match state.store.find_tenant(&sub.tenant_id).await {
        Ok(Some(tenant)) => {
            let mail = templates::payment_confirmed(payment.amount, sub.next_payment_at);
            email::notify(state.notifier.as_ref(), &tenant.email, &mail).await
        }
        Ok(None) => Some(format!("Tenant {} not found, confirmation not sent", sub.tenant_id)),
        Err(e) => {
            tracing::warn!(tenant_id = %sub.tenant_id, error = %e, "Tenant lookup failed after settlement");
            Some("Confirmation email not sent".to_string())
        }
    };

    Ok(Settlement {
        payment,
        subscription: sub,
        warning,
    })
}
