//! Subscription state machine
//!
//! Stored status (ACTIVE / PENDING / PAUSED / CANCELLED) crossed with the grace
//! sub-state carried in `grace_started_at`. Every transition that writes more
//! than one row runs in a transaction that locks only this subscription's rows.

use serde::Serialize;
use shared::billing::{
    GraceStatus, Payment, PaymentMethod, PaymentStatus, Subscription, SubscriptionStatus, Tenant,
};
use shared::error::{AppError, ErrorCode};

use super::{audit, plan_for};
use crate::db::audit::action;
use crate::email::{self, templates};
use crate::error::ServiceResult;
use crate::gateway::{CreateRecurring, GatewayError, RecurringPayment};
use crate::state::AppState;

/// Payments shown in the billing overview
const OVERVIEW_PAYMENTS: i64 = 20;

/// First detection of a missed manual payment
pub fn can_start_grace(sub: &Subscription, now: i64) -> bool {
    sub.status == SubscriptionStatus::Active
        && sub.payment_method == PaymentMethod::Manual
        && sub.is_past_due(now)
        && sub.grace_started_at.is_none()
}

/// Start grace: create the PENDING payment for the missed cycle and stamp
/// `grace_started_at`.
///
/// Returns `false` when the locked row no longer qualifies (another worker got
/// there first).
pub async fn start_grace(
    state: &AppState,
    sub: &Subscription,
    tenant: &Tenant,
    now: i64,
) -> ServiceResult<bool> {
    let plan = plan_for(state, sub).await?;

    let mut tx = state.store.begin().await?;
    let mut locked = tx
        .lock_subscription(&sub.id)
        .await?
        .ok_or_else(|| AppError::subscription_not_found(&sub.id))?;
    if !can_start_grace(&locked, now) {
        return Ok(false);
    }

    let payment = Payment {
        id: uuid::Uuid::new_v4().to_string(),
        subscription_id: locked.id.clone(),
        amount: plan.price,
        status: PaymentStatus::Pending,
        payment_method: PaymentMethod::Manual,
        due_date: locked.next_payment_at,
        paid_at: None,
        external_id: None,
        proof_reference: None,
        created_at: now,
    };
    tx.insert_payment(&payment).await?;

    locked.grace_started_at = Some(now);
    locked.updated_at = now;
    tx.update_subscription(&locked).await?;
    tx.commit().await?;

    tracing::info!(
        tenant_id = %tenant.id,
        subscription_id = %locked.id,
        payment_id = %payment.id,
        "Grace period started"
    );

    audit(
        state,
        &tenant.id,
        action::GRACE_STARTED,
        serde_json::json!({
            "subscription_id": locked.id,
            "payment_id": payment.id,
            "due_date": payment.due_date,
        }),
        now,
    )
    .await;

    let mail = templates::grace_started(plan.price, payment.due_date, locked.grace_period_days);
    email::notify(state.notifier.as_ref(), &tenant.email, &mail).await;

    Ok(true)
}

/// Grace lapsed without payment: take the tenant offline.
///
/// The subscription itself is left alone. Returns `false` when the tenant was
/// already inactive, so the notice goes out once.
pub async fn expire_grace(
    state: &AppState,
    sub: &Subscription,
    tenant: &Tenant,
    now: i64,
) -> ServiceResult<bool> {
    if !sub.grace_status(now).is_expired || !tenant.is_active {
        return Ok(false);
    }

    state.store.set_tenant_active(&tenant.id, false).await?;

    tracing::warn!(
        tenant_id = %tenant.id,
        subscription_id = %sub.id,
        "Grace period expired, tenant deactivated"
    );

    audit(
        state,
        &tenant.id,
        action::GRACE_EXPIRED,
        serde_json::json!({
            "subscription_id": sub.id,
            "grace_started_at": sub.grace_started_at,
        }),
        now,
    )
    .await;

    email::notify(
        state.notifier.as_ref(),
        &tenant.email,
        &templates::deactivated(&tenant.subdomain),
    )
    .await;

    Ok(true)
}

/// Reminder while grace is running; no state change
pub async fn send_reminder(state: &AppState, tenant: &Tenant, grace: &GraceStatus) -> Option<String> {
    let mail = templates::grace_reminder(grace.days_remaining, grace.ends_at);
    email::notify(state.notifier.as_ref(), &tenant.email, &mail).await
}

/// Gateway reports the agreement authorized: the gateway is authoritative for
/// the next due date.
pub async fn resolve_via_gateway(
    state: &AppState,
    sub_id: &str,
    recurring: &RecurringPayment,
    now: i64,
) -> ServiceResult<Subscription> {
    let mut tx = state.store.begin().await?;
    let mut locked = tx
        .lock_subscription(sub_id)
        .await?
        .ok_or_else(|| AppError::subscription_not_found(sub_id))?;
    if locked.status == SubscriptionStatus::Cancelled {
        return Err(AppError::new(ErrorCode::SubscriptionCancelled).into());
    }

    locked.status = SubscriptionStatus::Active;
    locked.payment_method = PaymentMethod::Automated;
    locked.external_id = Some(recurring.id.clone());
    locked.grace_started_at = None;
    if let Some(next) = recurring.next_payment_date {
        locked.next_payment_at = locked.next_payment_at.max(next);
    }
    locked.updated_at = now;
    tx.update_subscription(&locked).await?;
    tx.commit().await?;

    tracing::info!(
        tenant_id = %locked.tenant_id,
        subscription_id = %locked.id,
        external_id = %recurring.id,
        next_payment_at = locked.next_payment_at,
        "Subscription confirmed by gateway"
    );

    audit(
        state,
        &locked.tenant_id,
        action::GATEWAY_CONFIRMED,
        serde_json::json!({
            "subscription_id": locked.id,
            "external_id": recurring.id,
            "next_payment_at": locked.next_payment_at,
        }),
        now,
    )
    .await;

    Ok(locked)
}

/// Gateway agreement exists but is not authorized yet
async fn mark_gateway_pending(
    state: &AppState,
    sub_id: &str,
    recurring: &RecurringPayment,
    now: i64,
) -> ServiceResult<Subscription> {
    let mut tx = state.store.begin().await?;
    let mut locked = tx
        .lock_subscription(sub_id)
        .await?
        .ok_or_else(|| AppError::subscription_not_found(sub_id))?;
    if locked.status == SubscriptionStatus::Cancelled {
        return Err(AppError::new(ErrorCode::SubscriptionCancelled).into());
    }

    locked.status = SubscriptionStatus::Pending;
    locked.payment_method = PaymentMethod::Automated;
    locked.external_id = Some(recurring.id.clone());
    locked.updated_at = now;
    tx.update_subscription(&locked).await?;
    tx.commit().await?;

    tracing::info!(
        subscription_id = %locked.id,
        external_id = %recurring.id,
        gateway_status = %recurring.status,
        "Subscription awaiting gateway authorization"
    );
    Ok(locked)
}

/// Subscription after a gateway poll, plus the hosted page to send the payer to
#[derive(Debug, Clone, Serialize)]
pub struct GatewaySync {
    pub subscription: Subscription,
    pub redirect_url: Option<String>,
}

/// Adopt the gateway's view of a recurring agreement
pub async fn apply_recurring(
    state: &AppState,
    sub_id: &str,
    recurring: &RecurringPayment,
    now: i64,
) -> ServiceResult<GatewaySync> {
    if recurring.is_authorized() {
        let subscription = resolve_via_gateway(state, sub_id, recurring, now).await?;
        Ok(GatewaySync {
            subscription,
            redirect_url: None,
        })
    } else {
        let subscription = mark_gateway_pending(state, sub_id, recurring, now).await?;
        Ok(GatewaySync {
            subscription,
            redirect_url: recurring.init_point.clone(),
        })
    }
}

/// MANUAL → AUTOMATED.
///
/// An existing gateway agreement is polled and adopted; otherwise a new one is
/// created for the plan price and cycle.
pub async fn switch_to_automated(
    state: &AppState,
    subdomain: &str,
    email: &str,
    now: i64,
) -> ServiceResult<GatewaySync> {
    let tenant = state
        .store
        .find_tenant_by_subdomain(subdomain)
        .await?
        .ok_or_else(|| AppError::tenant_not_found(subdomain))?;
    let sub = state
        .store
        .find_subscription_by_tenant(&tenant.id)
        .await?
        .ok_or_else(|| AppError::subscription_not_found(&tenant.id))?;

    if sub.status == SubscriptionStatus::Cancelled {
        return Err(AppError::new(ErrorCode::SubscriptionCancelled).into());
    }
    if sub.is_automated_and_active() {
        return Err(AppError::new(ErrorCode::AlreadyAutomated).into());
    }

    let recurring = match sub.external_id.as_deref() {
        Some(external_id) => state.gateway.get_recurring_payment(external_id).await?,
        None => {
            let plan = plan_for(state, &sub).await?;
            let payer_email = if email.trim().is_empty() {
                tenant.email.clone()
            } else {
                email.trim().to_string()
            };
            let req = CreateRecurring {
                reason: format!("{} ({})", plan.name, tenant.subdomain),
                external_reference: sub.id.clone(),
                payer_email,
                amount: plan.price,
                frequency_months: plan.cycle_months(),
                currency: state.settings.currency.clone(),
            };
            state.gateway.create_recurring_payment(&req).await?
        }
    };

    let synced = apply_recurring(state, &sub.id, &recurring, now).await?;

    audit(
        state,
        &tenant.id,
        action::METHOD_SWITCHED,
        serde_json::json!({
            "subscription_id": sub.id,
            "external_id": recurring.id,
            "gateway_status": recurring.status,
        }),
        now,
    )
    .await;

    Ok(synced)
}

/// How an operator identifies the subscription to check
#[derive(Debug, Clone)]
pub enum SubscriptionLookup {
    Id(String),
    ExternalId(String),
}

/// On-demand poll of the gateway for one subscription
pub async fn check_subscription(
    state: &AppState,
    lookup: &SubscriptionLookup,
    now: i64,
) -> ServiceResult<GatewaySync> {
    let sub = match lookup {
        SubscriptionLookup::Id(id) => state.store.find_subscription(id).await?,
        SubscriptionLookup::ExternalId(ext) => {
            state.store.find_subscription_by_external_id(ext).await?
        }
    };
    let sub = sub.ok_or_else(|| {
        let key = match lookup {
            SubscriptionLookup::Id(id) | SubscriptionLookup::ExternalId(id) => id.clone(),
        };
        AppError::subscription_not_found(key)
    })?;

    let external_id = sub
        .external_id
        .as_deref()
        .ok_or_else(|| AppError::new(ErrorCode::NoExternalSubscription))?;

    let recurring = state.gateway.get_recurring_payment(external_id).await?;
    apply_recurring(state, &sub.id, &recurring, now).await
}

async fn tenant_subscription(
    state: &AppState,
    subdomain: &str,
) -> ServiceResult<(Tenant, Subscription)> {
    let tenant = state
        .store
        .find_tenant_by_subdomain(subdomain)
        .await?
        .ok_or_else(|| AppError::tenant_not_found(subdomain))?;
    let sub = state
        .store
        .find_subscription_by_tenant(&tenant.id)
        .await?
        .ok_or_else(|| AppError::subscription_not_found(&tenant.id))?;
    Ok((tenant, sub))
}

/// Explicit cancellation; never touches `Tenant.is_active`.
///
/// Returns the cancelled subscription and a notification warning, if any.
pub async fn cancel_subscription(
    state: &AppState,
    subdomain: &str,
    now: i64,
) -> ServiceResult<(Subscription, Option<String>)> {
    let (tenant, sub) = tenant_subscription(state, subdomain).await?;
    if sub.status == SubscriptionStatus::Cancelled {
        return Ok((sub, None));
    }

    if let Some(external_id) = sub.external_id.as_deref() {
        match state.gateway.cancel_recurring_payment(external_id).await {
            Ok(()) => {}
            Err(GatewayError::NotFound(_)) => {
                tracing::info!(external_id = external_id, "Gateway agreement already gone");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut tx = state.store.begin().await?;
    let mut locked = tx
        .lock_subscription(&sub.id)
        .await?
        .ok_or_else(|| AppError::subscription_not_found(&sub.id))?;
    locked.status = SubscriptionStatus::Cancelled;
    locked.updated_at = now;
    tx.update_subscription(&locked).await?;
    tx.commit().await?;

    tracing::info!(tenant_id = %tenant.id, subscription_id = %locked.id, "Subscription cancelled");

    audit(
        state,
        &tenant.id,
        action::SUBSCRIPTION_CANCELLED,
        serde_json::json!({ "subscription_id": locked.id, "external_id": locked.external_id }),
        now,
    )
    .await;

    let warning = email::notify(
        state.notifier.as_ref(),
        &tenant.email,
        &templates::subscription_cancelled(&tenant.subdomain),
    )
    .await;

    Ok((locked, warning))
}

/// Push the current plan price to the gateway agreement
pub async fn sync_plan_amount(
    state: &AppState,
    subdomain: &str,
    now: i64,
) -> ServiceResult<Subscription> {
    let (tenant, sub) = tenant_subscription(state, subdomain).await?;
    let external_id = sub
        .external_id
        .as_deref()
        .ok_or_else(|| AppError::new(ErrorCode::NoExternalSubscription))?;
    let plan = plan_for(state, &sub).await?;

    state
        .gateway
        .update_recurring_payment_amount(external_id, plan.price)
        .await?;

    tracing::info!(
        tenant_id = %tenant.id,
        external_id = external_id,
        amount = %plan.price,
        "Gateway amount synced with plan"
    );

    audit(
        state,
        &tenant.id,
        action::AMOUNT_SYNCED,
        serde_json::json!({ "external_id": external_id, "amount": plan.price.to_string() }),
        now,
    )
    .await;

    Ok(sub)
}

/// Billing state as shown to the console
#[derive(Debug, Clone, Serialize)]
pub struct BillingOverview {
    pub tenant: Tenant,
    pub subscription: Subscription,
    pub grace: GraceStatus,
    pub payments: Vec<Payment>,
}

pub async fn billing_overview(
    state: &AppState,
    subdomain: &str,
    now: i64,
) -> ServiceResult<BillingOverview> {
    let (tenant, sub) = tenant_subscription(state, subdomain).await?;
    let payments = state.store.list_payments(&sub.id, OVERVIEW_PAYMENTS).await?;
    Ok(BillingOverview {
        grace: sub.grace_status(now),
        tenant,
        subscription: sub,
        payments,
    })
}
