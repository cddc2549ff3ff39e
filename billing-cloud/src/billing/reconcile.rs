//! Webhook reconciliation: pull the gateway's payment truth into the ledger
//!
//! Local payments are upserted on the gateway payment id, so redelivered
//! notifications never create a second row or advance a cycle twice.

use serde::Deserialize;
use shared::billing::{Payment, PaymentMethod, PaymentStatus};
use shared::error::AppError;

use super::{advance_next_payment, audit};
use crate::db::audit::action;
use crate::email::{self, templates};
use crate::error::ServiceResult;
use crate::state::AppState;

/// Gateway notification body
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEvent {
    /// Payment creation or update; everything else is acknowledged and ignored
    pub fn is_payment_event(&self) -> bool {
        matches!(
            self.action.as_deref(),
            Some("payment.created" | "payment.updated")
        )
    }

    /// `data.id`, sent as a string or a number
    pub fn data_id(&self) -> Option<String> {
        match &self.data["id"] {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// What one payment notification did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSync {
    /// Gateway payment is not tied to a known subscription
    UnknownSubscription,
    /// Same status already recorded, or the row is already terminal
    Unchanged,
    /// Row inserted or moved to a non-completed status
    Recorded(PaymentStatus),
    /// Row moved to COMPLETED and the cycle advanced
    Completed,
}

/// Fetch the canonical payment from the gateway and upsert it locally
pub async fn sync_gateway_payment(
    state: &AppState,
    gateway_payment_id: &str,
    now: i64,
) -> ServiceResult<PaymentSync> {
    let gp = state.gateway.get_payment(gateway_payment_id).await?;
    let status = PaymentStatus::from_gateway(&gp.status);

    let Some(recurring_id) = gp.related_recurring_id.as_deref() else {
        tracing::info!(payment_id = %gp.id, "Gateway payment has no recurring agreement, ignoring");
        return Ok(PaymentSync::UnknownSubscription);
    };
    let Some(sub) = state
        .store
        .find_subscription_by_external_id(recurring_id)
        .await?
    else {
        tracing::info!(
            payment_id = %gp.id,
            external_id = recurring_id,
            "No subscription for gateway agreement, ignoring"
        );
        return Ok(PaymentSync::UnknownSubscription);
    };

    let mut tx = state.store.begin().await?;

    let candidate = Payment {
        id: uuid::Uuid::new_v4().to_string(),
        subscription_id: sub.id.clone(),
        amount: gp.amount,
        status: PaymentStatus::Pending,
        payment_method: PaymentMethod::Automated,
        due_date: sub.next_payment_at,
        paid_at: None,
        external_id: Some(gp.id.clone()),
        proof_reference: None,
        created_at: now,
    };
    let inserted = tx.insert_payment_if_absent(&candidate).await?;
    let existing = tx
        .lock_payment_by_external_id(&gp.id)
        .await?
        .ok_or_else(|| AppError::internal("Upserted payment row missing"))?;

    if existing.status == status {
        if inserted {
            tx.commit().await?;
            tracing::info!(payment_id = %existing.id, external_id = %gp.id, status = %status, "Gateway payment recorded");
            return Ok(PaymentSync::Recorded(status));
        }
        tracing::info!(external_id = %gp.id, status = %status, "Duplicate payment notification");
        return Ok(PaymentSync::Unchanged);
    }
    if !existing.status.can_transition_to(status) {
        tracing::info!(
            external_id = %gp.id,
            current = %existing.status,
            reported = %status,
            "Payment already final, ignoring reported status"
        );
        return Ok(PaymentSync::Unchanged);
    }

    let paid_at = (status == PaymentStatus::Completed).then_some(now);
    tx.update_payment_status(&existing.id, status, paid_at)
        .await?;

    if status != PaymentStatus::Completed {
        tx.commit().await?;
        tracing::info!(payment_id = %existing.id, status = %status, "Gateway payment status updated");
        audit(
            state,
            &sub.tenant_id,
            action::PAYMENT_RECORDED,
            serde_json::json!({ "payment_id": existing.id, "external_id": gp.id, "status": status }),
            now,
        )
        .await;
        return Ok(PaymentSync::Recorded(status));
    }

    let mut locked = tx
        .lock_subscription(&sub.id)
        .await?
        .ok_or_else(|| AppError::subscription_not_found(&sub.id))?;
    locked.next_payment_at =
        advance_next_payment(locked.next_payment_at, now, locked.cycle_months())?;
    locked.grace_started_at = None;
    locked.updated_at = now;
    tx.update_subscription(&locked).await?;
    tx.commit().await?;

    tracing::info!(
        tenant_id = %locked.tenant_id,
        payment_id = %existing.id,
        external_id = %gp.id,
        next_payment_at = locked.next_payment_at,
        "Gateway payment completed"
    );

    audit(
        state,
        &locked.tenant_id,
        action::PAYMENT_CONFIRMED,
        serde_json::json!({
            "payment_id": existing.id,
            "external_id": gp.id,
            "amount": gp.amount.to_string(),
            "next_payment_at": locked.next_payment_at,
        }),
        now,
    )
    .await;

    match state.store.find_tenant(&locked.tenant_id).await {
        Ok(Some(tenant)) => {
            let mail = templates::payment_confirmed(gp.amount, locked.next_payment_at);
            email::notify(state.notifier.as_ref(), &tenant.email, &mail).await;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(tenant_id = %locked.tenant_id, error = %e, "Tenant lookup failed after gateway payment");
        }
    }

    Ok(PaymentSync::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::settlement::mark_paid;
    use crate::billing::testing::*;
    use crate::gateway::{GatewayError, GatewayPayment};
    use rust_decimal::Decimal;
    use shared::error::ErrorCode;
    use shared::util::add_months;

    fn gateway_payment(id: &str, status: &str, recurring: Option<&str>) -> GatewayPayment {
        GatewayPayment {
            id: id.into(),
            status: status.into(),
            amount: Decimal::from(100),
            related_recurring_id: recurring.map(String::from),
        }
    }

    #[test]
    fn parses_gateway_notification() {
        let ev: WebhookEvent = serde_json::from_str(
            r#"{"type": "payment", "action": "payment.updated", "data": {"id": 987654}}"#,
        )
        .unwrap();
        assert!(ev.is_payment_event());
        assert_eq!(ev.data_id().as_deref(), Some("987654"));

        let other: WebhookEvent =
            serde_json::from_str(r#"{"type": "plan", "action": "plan.updated"}"#).unwrap();
        assert!(!other.is_payment_event());
        assert_eq!(other.data_id(), None);
    }

    #[tokio::test]
    async fn approved_payment_completes_and_advances_from_now() {
        let h = Harness::new();
        let sub = h.seed_automated("t1", "pre-1", NOW - 2 * DAY);
        h.gateway
            .put_payment(gateway_payment("mp-1", "approved", Some("pre-1")));

        let out = sync_gateway_payment(&h.state, "mp-1", NOW).await.unwrap();

        assert_eq!(out, PaymentSync::Completed);
        let payments = h.store.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Completed);
        assert_eq!(payments[0].paid_at, Some(NOW));
        assert_eq!(payments[0].amount, Decimal::from(100));
        assert_eq!(payments[0].external_id.as_deref(), Some("mp-1"));

        let stored = h.store.subscription(&sub.id);
        assert_eq!(stored.next_payment_at, add_months(NOW, 1).unwrap());
        assert_eq!(stored.grace_started_at, None);
        assert_eq!(h.notifier.count_subject("Payment confirmed"), 1);
    }

    #[tokio::test]
    async fn replayed_notification_is_idempotent() {
        let h = Harness::new();
        let sub = h.seed_automated("t1", "pre-1", NOW - 2 * DAY);
        h.gateway
            .put_payment(gateway_payment("mp-1", "approved", Some("pre-1")));

        sync_gateway_payment(&h.state, "mp-1", NOW).await.unwrap();
        let after_first = h.store.subscription(&sub.id).next_payment_at;

        let out = sync_gateway_payment(&h.state, "mp-1", NOW + DAY)
            .await
            .unwrap();

        assert_eq!(out, PaymentSync::Unchanged);
        assert_eq!(h.store.payments().len(), 1);
        assert_eq!(h.store.subscription(&sub.id).next_payment_at, after_first);
    }

    #[tokio::test]
    async fn pending_then_approved_moves_the_same_row() {
        let h = Harness::new();
        let sub = h.seed_automated("t1", "pre-1", NOW - DAY);
        h.gateway
            .put_payment(gateway_payment("mp-1", "in_process", Some("pre-1")));

        let out = sync_gateway_payment(&h.state, "mp-1", NOW).await.unwrap();
        assert_eq!(out, PaymentSync::Recorded(PaymentStatus::Pending));
        assert_eq!(h.store.subscription(&sub.id).next_payment_at, NOW - DAY);

        h.gateway
            .put_payment(gateway_payment("mp-1", "approved", Some("pre-1")));
        let out = sync_gateway_payment(&h.state, "mp-1", NOW + 1).await.unwrap();
        assert_eq!(out, PaymentSync::Completed);
        assert_eq!(h.store.payments().len(), 1);
        assert_eq!(h.store.payments()[0].status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn late_pending_does_not_regress_completed() {
        let h = Harness::new();
        let sub = h.seed_automated("t1", "pre-1", NOW - DAY);
        h.gateway
            .put_payment(gateway_payment("mp-1", "approved", Some("pre-1")));
        sync_gateway_payment(&h.state, "mp-1", NOW).await.unwrap();
        let advanced = h.store.subscription(&sub.id).next_payment_at;

        h.gateway
            .put_payment(gateway_payment("mp-1", "pending", Some("pre-1")));
        let out = sync_gateway_payment(&h.state, "mp-1", NOW + DAY)
            .await
            .unwrap();

        assert_eq!(out, PaymentSync::Unchanged);
        assert_eq!(h.store.payments()[0].status, PaymentStatus::Completed);
        assert_eq!(h.store.subscription(&sub.id).next_payment_at, advanced);
    }

    #[tokio::test]
    async fn rejected_payment_records_failure_without_advancing() {
        let h = Harness::new();
        let sub = h.seed_automated("t1", "pre-1", NOW - DAY);
        h.gateway
            .put_payment(gateway_payment("mp-2", "rejected", Some("pre-1")));

        let out = sync_gateway_payment(&h.state, "mp-2", NOW).await.unwrap();

        assert_eq!(out, PaymentSync::Recorded(PaymentStatus::Failed));
        assert_eq!(h.store.payments()[0].paid_at, None);
        assert_eq!(h.store.subscription(&sub.id).next_payment_at, NOW - DAY);
    }

    #[tokio::test]
    async fn unknown_agreement_is_ignored() {
        let h = Harness::new();
        h.gateway
            .put_payment(gateway_payment("mp-3", "approved", Some("pre-unknown")));
        h.gateway.put_payment(gateway_payment("mp-4", "approved", None));

        assert_eq!(
            sync_gateway_payment(&h.state, "mp-3", NOW).await.unwrap(),
            PaymentSync::UnknownSubscription
        );
        assert_eq!(
            sync_gateway_payment(&h.state, "mp-4", NOW).await.unwrap(),
            PaymentSync::UnknownSubscription
        );
        assert!(h.store.payments().is_empty());
    }

    #[tokio::test]
    async fn gateway_outage_is_retryable() {
        let h = Harness::new();
        h.gateway.fail_with(GatewayError::Timeout);
        let app: AppError = sync_gateway_payment(&h.state, "mp-1", NOW)
            .await
            .unwrap_err()
            .into();
        assert_eq!(app.code, ErrorCode::GatewayUnavailable);
    }

    #[tokio::test]
    async fn next_payment_never_decreases_across_confirmations() {
        let h = Harness::new();
        let sub = h.seed_automated("t1", "pre-1", NOW - DAY);
        let mut seen = vec![h.store.subscription(&sub.id).next_payment_at];

        // three gateway payments in quick succession, then a manual one
        for (i, at) in [NOW, NOW + DAY, NOW + 2 * DAY].into_iter().enumerate() {
            let id = format!("mp-{i}");
            h.gateway
                .put_payment(gateway_payment(&id, "approved", Some("pre-1")));
            sync_gateway_payment(&h.state, &id, at).await.unwrap();
            seen.push(h.store.subscription(&sub.id).next_payment_at);
        }
        let current = h.store.subscription(&sub.id);
        h.seed_pending_payment(&current, "pay-manual");
        mark_paid(&h.state, "pay-manual", NOW + 3 * DAY)
            .await
            .unwrap();
        seen.push(h.store.subscription(&sub.id).next_payment_at);

        assert!(seen.windows(2).all(|w| w[1] >= w[0]), "{seen:?}");
    }
}
