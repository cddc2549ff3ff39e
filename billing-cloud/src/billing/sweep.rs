//! Reconciliation sweep over past-due subscriptions
//!
//! Each subscription is processed on its own: one failure is logged and
//! counted, the rest of the sweep carries on.

use futures::StreamExt;
use serde::Serialize;
use shared::billing::Subscription;
use shared::error::AppError;

use super::lifecycle::{can_start_grace, expire_grace, resolve_via_gateway, send_reminder, start_grace};
use crate::error::ServiceResult;
use crate::state::AppState;

/// What the sweep did to one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    GraceStarted,
    Deactivated,
    Reminded,
    ResolvedByGateway,
    Skipped,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SweepFailure {
    pub subscription_id: String,
    pub tenant_id: String,
    pub error: String,
}

/// Aggregate outcome of one sweep
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub due: usize,
    pub grace_started: usize,
    pub deactivated: usize,
    pub reminded: usize,
    pub resolved: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    fn record(&mut self, action: SweepAction) {
        match action {
            SweepAction::GraceStarted => self.grace_started += 1,
            SweepAction::Deactivated => self.deactivated += 1,
            SweepAction::Reminded => self.reminded += 1,
            SweepAction::ResolvedByGateway => self.resolved += 1,
            SweepAction::Skipped => self.skipped += 1,
        }
    }
}

/// Sweep every ACTIVE subscription whose due date has passed.
///
/// Only listing the due set can fail the sweep as a whole.
pub async fn run_sweep(state: &AppState, now: i64) -> ServiceResult<SweepReport> {
    let due = state.store.list_due_subscriptions(now).await?;
    let mut report = SweepReport {
        due: due.len(),
        ..Default::default()
    };
    let concurrency = state.settings.sweep_concurrency.max(1);

    let results: Vec<_> = futures::stream::iter(due)
        .map(|sub| async move {
            let result = process_subscription(state, &sub, now).await;
            (sub, result)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for (sub, result) in results {
        match result {
            Ok(action) => report.record(action),
            Err(e) => {
                tracing::error!(
                    tenant_id = %sub.tenant_id,
                    subscription_id = %sub.id,
                    error = %e,
                    "Sweep failed for subscription"
                );
                report.failed += 1;
                report.failures.push(SweepFailure {
                    subscription_id: sub.id,
                    tenant_id: sub.tenant_id,
                    error: e.operator_message(),
                });
            }
        }
    }

    tracing::info!(
        due = report.due,
        grace_started = report.grace_started,
        deactivated = report.deactivated,
        reminded = report.reminded,
        resolved = report.resolved,
        failed = report.failed,
        "Billing sweep finished"
    );
    Ok(report)
}

async fn process_subscription(
    state: &AppState,
    sub: &Subscription,
    now: i64,
) -> ServiceResult<SweepAction> {
    let tenant = state
        .store
        .find_tenant(&sub.tenant_id)
        .await?
        .ok_or_else(|| AppError::tenant_not_found(&sub.tenant_id))?;

    if sub.is_automated() {
        if let Some(external_id) = sub.external_id.as_deref() {
            match state.gateway.get_recurring_payment(external_id).await {
                Ok(rp) if rp.is_authorized() && rp.next_payment_date.is_some_and(|n| n > now) => {
                    resolve_via_gateway(state, &sub.id, &rp, now).await?;
                    return Ok(SweepAction::ResolvedByGateway);
                }
                Ok(rp) => {
                    tracing::info!(
                        subscription_id = %sub.id,
                        gateway_status = %rp.status,
                        "Gateway has not collected the cycle yet"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        subscription_id = %sub.id,
                        external_id = external_id,
                        error = %e,
                        "Gateway poll failed, continuing with grace bookkeeping"
                    );
                }
            }
        }
    }

    let grace = sub.grace_status(now);
    if can_start_grace(sub, now) {
        let started = start_grace(state, sub, &tenant, now).await?;
        return Ok(if started {
            SweepAction::GraceStarted
        } else {
            SweepAction::Skipped
        });
    }
    if grace.is_expired {
        let flipped = expire_grace(state, sub, &tenant, now).await?;
        return Ok(if flipped {
            SweepAction::Deactivated
        } else {
            SweepAction::Skipped
        });
    }
    if grace.is_active {
        send_reminder(state, &tenant, &grace).await;
        return Ok(SweepAction::Reminded);
    }
    Ok(SweepAction::Skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::testing::*;
    use crate::gateway::{GatewayError, RecurringPayment};
    use shared::billing::{PaymentMethod, PaymentStatus, SubscriptionStatus};

    #[tokio::test]
    async fn missed_manual_payment_starts_grace() {
        let h = Harness::new();
        let sub = h.seed_manual("t1", NOW - DAY, None);

        let report = run_sweep(&h.state, NOW).await.unwrap();

        assert_eq!(report.due, 1);
        assert_eq!(report.grace_started, 1);
        let payments = h.store.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Pending);
        assert_eq!(payments[0].payment_method, PaymentMethod::Manual);
        assert_eq!(payments[0].due_date, NOW - DAY);
        assert_eq!(payments[0].amount, plan_price());
        assert_eq!(h.store.subscription(&sub.id).grace_started_at, Some(NOW));
        assert_eq!(h.notifier.count_subject("Payment due"), 1);
    }

    #[tokio::test]
    async fn expired_grace_deactivates_once() {
        let h = Harness::new();
        h.seed_manual("t1", NOW - 25 * DAY, Some(NOW - 20 * DAY));

        let first = run_sweep(&h.state, NOW).await.unwrap();
        assert_eq!(first.deactivated, 1);
        assert!(!h.store.tenant("t1").is_active);
        assert_eq!(h.notifier.count_subject("Site deactivated"), 1);

        let second = run_sweep(&h.state, NOW + DAY).await.unwrap();
        assert_eq!(second.deactivated, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(h.notifier.count_subject("Site deactivated"), 1);
        assert!(h.store.payments().is_empty());
    }

    #[tokio::test]
    async fn running_grace_sends_reminder_without_writes() {
        let h = Harness::new();
        let sub = h.seed_manual("t1", NOW - 5 * DAY, Some(NOW - 5 * DAY));

        let report = run_sweep(&h.state, NOW).await.unwrap();

        assert_eq!(report.reminded, 1);
        assert_eq!(h.store.subscription(&sub.id), sub);
        assert!(h.store.payments().is_empty());
        assert_eq!(h.notifier.sent().len(), 1);
        assert!(h.notifier.sent()[0].body.contains("10 days of grace period remain"));
    }

    #[tokio::test]
    async fn grace_starts_once_per_missed_cycle() {
        let h = Harness::new();
        h.seed_manual("t1", NOW - DAY, None);

        run_sweep(&h.state, NOW).await.unwrap();
        let again = run_sweep(&h.state, NOW + 2 * DAY).await.unwrap();

        assert_eq!(again.grace_started, 0);
        assert_eq!(again.reminded, 1);
        assert_eq!(h.store.payments().len(), 1);
    }

    #[tokio::test]
    async fn one_failing_tenant_does_not_stop_the_sweep() {
        let h = Harness::new();
        h.seed_manual("bad", NOW - DAY, None);
        let good = h.seed_manual("good", NOW - 2 * DAY, None);
        h.store.fail(|f| {
            f.tenant_ids.insert("bad".into());
        });

        let report = run_sweep(&h.state, NOW).await.unwrap();

        assert_eq!(report.due, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].tenant_id, "bad");
        assert_eq!(report.grace_started, 1);
        assert_eq!(h.store.subscription(&good.id).grace_started_at, Some(NOW));
    }

    #[tokio::test]
    async fn listing_failure_fails_the_sweep() {
        let h = Harness::new();
        h.seed_manual("t1", NOW - DAY, None);
        h.store.fail(|f| f.list_due = true);
        assert!(run_sweep(&h.state, NOW).await.is_err());
    }

    #[tokio::test]
    async fn notification_failure_keeps_grace_started() {
        let h = Harness::new();
        let sub = h.seed_manual("t1", NOW - DAY, None);
        h.notifier.set_failing(true);

        let report = run_sweep(&h.state, NOW).await.unwrap();

        assert_eq!(report.grace_started, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(h.store.subscription(&sub.id).grace_started_at, Some(NOW));
    }

    #[tokio::test]
    async fn automated_subscription_resolved_by_gateway() {
        let h = Harness::new();
        let sub = h.seed_automated("t1", "pre-1", NOW - DAY);
        h.gateway.put_recurring(RecurringPayment {
            id: "pre-1".into(),
            status: "authorized".into(),
            next_payment_date: Some(NOW + 29 * DAY),
            init_point: None,
        });

        let report = run_sweep(&h.state, NOW).await.unwrap();

        assert_eq!(report.resolved, 1);
        let stored = h.store.subscription(&sub.id);
        assert_eq!(stored.next_payment_at, NOW + 29 * DAY);
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(h.store.payments().is_empty());
    }

    #[tokio::test]
    async fn automated_subscription_is_never_charged_or_put_in_grace() {
        let h = Harness::new();
        let sub = h.seed_automated("t1", "pre-1", NOW - DAY);
        h.gateway.fail_with(GatewayError::Timeout);

        let report = run_sweep(&h.state, NOW).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert!(h.store.payments().is_empty());
        assert_eq!(h.store.subscription(&sub.id).grace_started_at, None);
    }

    #[tokio::test]
    async fn stale_authorized_agreement_does_not_resolve() {
        let h = Harness::new();
        let mut sub = h.seed_automated("t1", "pre-1", NOW - 20 * DAY);
        sub.grace_started_at = Some(NOW - 16 * DAY);
        h.store.put_subscription(sub.clone());
        h.gateway.put_recurring(RecurringPayment {
            id: "pre-1".into(),
            status: "authorized".into(),
            next_payment_date: Some(NOW - 20 * DAY),
            init_point: None,
        });

        let report = run_sweep(&h.state, NOW).await.unwrap();

        assert_eq!(report.deactivated, 1);
        assert!(!h.store.tenant("t1").is_active);
    }

    #[tokio::test]
    async fn cancelled_and_current_subscriptions_are_not_swept() {
        let h = Harness::new();
        let mut cancelled = h.seed_manual("gone", NOW - DAY, None);
        cancelled.status = SubscriptionStatus::Cancelled;
        h.store.put_subscription(cancelled);
        h.seed_manual("current", NOW + DAY, None);

        let report = run_sweep(&h.state, NOW).await.unwrap();

        assert_eq!(report.due, 0);
        assert!(h.store.payments().is_empty());
        assert!(h.notifier.sent().is_empty());
    }
}
